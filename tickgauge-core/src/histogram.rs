//! Histogram accumulator
//!
//! ## Overview
//!
//! A single-ported store of `BINS` saturating 16-bit counters. One mutation
//! (increment commit or write) goes through the port per tick; the read
//! path only loads a data register and never serializes against mutation.
//!
//! ## The two-phase increment
//!
//! The store has one port, but an increment needs both a read and a write.
//! It is therefore pipelined across two ticks:
//!
//! ```text
//! tick 0: latch clamped address + current counter value
//! tick 1: write back value+1 to the latched address copy
//! ```
//!
//! The address copy is what makes the increment immune to the address input
//! changing between the two phases. The write-back commits at the start of
//! the next tick, before any new read phase samples the store, so back-to-
//! back increments to one address each observe the previous write: N
//! consecutive increments yield exactly `initial + N`, no loss, no double
//! count.
//!
//! Priority between simultaneous requests is `increment > write`. A
//! write-back in flight owns the port, so a plain write landing on that
//! tick is discarded; the orchestrator keeps mutation sources mutually
//! exclusive, making that case unreachable in the composed channel.
//!
//! Out-of-range addresses clamp to the last bin rather than erroring, on
//! both the mutation and read paths.

use core::convert::Infallible;

use crate::domain::Synchronous;

/// One tick of port requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemCommand {
    /// Start a two-phase increment at `index_w`.
    pub increment: bool,
    /// Write `data_in` at `index_w` (loses to `increment`).
    pub write: bool,
    /// Load the read register from `index_r`.
    pub read: bool,
    /// Mutation address.
    pub index_w: u16,
    /// Read address.
    pub index_r: u16,
    /// Write data.
    pub data_in: u16,
}

impl MemCommand {
    /// An increment request.
    pub fn increment(index: u16) -> Self {
        Self {
            increment: true,
            index_w: index,
            ..Self::default()
        }
    }

    /// A write request.
    pub fn write(index: u16, data: u16) -> Self {
        Self {
            write: true,
            index_w: index,
            data_in: data,
            ..Self::default()
        }
    }

    /// A read request.
    pub fn read(index: u16) -> Self {
        Self {
            read: true,
            index_r: index,
            ..Self::default()
        }
    }
}

/// Second increment phase, carried between ticks.
#[derive(Debug, Clone, Copy)]
struct PendingWriteBack {
    addr: usize,
    value: u16,
}

/// Saturating counter table behind a single mutation port.
#[derive(Debug, Clone)]
pub struct Histogram<const BINS: usize> {
    mem: [u16; BINS],
    pending: Option<PendingWriteBack>,
    data_reg: u16,
    data_loaded: bool,
}

impl<const BINS: usize> Default for Histogram<BINS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const BINS: usize> Histogram<BINS> {
    const AT_LEAST_ONE_BIN: () = assert!(BINS > 0, "histogram needs at least one bin");

    /// Zero-initialized table.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::AT_LEAST_ONE_BIN;
        Self {
            mem: [0; BINS],
            pending: None,
            data_reg: 0,
            data_loaded: false,
        }
    }

    /// Number of bins.
    pub const fn bins(&self) -> usize {
        BINS
    }

    fn clamp(addr: u16) -> usize {
        if addr as usize >= BINS {
            BINS - 1
        } else {
            addr as usize
        }
    }

    /// Read-data register, valid one tick after a read request.
    ///
    /// Returns `WouldBlock` until the first read has completed; after that
    /// the register simply holds the most recently loaded value.
    pub fn data(&self) -> nb::Result<u16, Infallible> {
        if self.data_loaded {
            Ok(self.data_reg)
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Raw read-data bus, regardless of whether a read has completed.
    pub fn data_bus(&self) -> u16 {
        self.data_reg
    }

    /// Debug/test view of the counters. Host readout goes through the
    /// read port.
    pub fn as_slice(&self) -> &[u16] {
        &self.mem
    }
}

impl<const BINS: usize> Synchronous for Histogram<BINS> {
    type Input = MemCommand;
    type Output = ();

    fn step(&mut self, cmd: MemCommand) {
        // Phase 1 of an in-flight increment commits first and owns the
        // port for this tick.
        let port_taken = if let Some(wb) = self.pending.take() {
            self.mem[wb.addr] = wb.value.saturating_add(1);
            true
        } else {
            false
        };

        if cmd.increment {
            // Phase 0: latch the clamped address and the value as of this
            // tick; the input address is free to change afterwards.
            let addr = Self::clamp(cmd.index_w);
            self.pending = Some(PendingWriteBack {
                addr,
                value: self.mem[addr],
            });
        } else if cmd.write && !port_taken {
            self.mem[Self::clamp(cmd.index_w)] = cmd.data_in;
        }

        if cmd.read {
            self.data_reg = self.mem[Self::clamp(cmd.index_r)];
            self.data_loaded = true;
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}
