//! Edge detection and cross-domain pulse transfer
//!
//! Two small primitives used wherever a single control bit has to move
//! between stages or domains:
//!
//! - [`EdgeDetector`] turns a level into same-tick `rose`/`fell` strobes by
//!   comparing against a registered previous sample.
//! - [`PulseCrossing`] carries a one-tick pulse between two independently
//!   clocked domains. The source side flips a toggle; the destination
//!   resamples the toggle through a two-stage chain and asserts for exactly
//!   one of its own ticks per observed flip.
//!
//! The crossing makes no ordering promise for pulses sent faster than its
//! round trip: two flips between destination ticks cancel and both pulses
//! are lost. Callers gate on a busy flag so that never happens in practice.

use crate::domain::Synchronous;

/// Same-tick edge strobes for a sampled level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Level stepped low to high this tick.
    pub rose: bool,
    /// Level stepped high to low this tick.
    pub fell: bool,
}

/// Compares the live level against last tick's sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector {
    prev: bool,
}

impl EdgeDetector {
    /// Detector with the previous sample low.
    pub const fn new() -> Self {
        Self { prev: false }
    }
}

impl Synchronous for EdgeDetector {
    type Input = bool;
    type Output = EdgeEvent;

    fn step(&mut self, level: bool) -> EdgeEvent {
        let event = EdgeEvent {
            rose: level && !self.prev,
            fell: !level && self.prev,
        };
        self.prev = level;
        event
    }

    fn reset(&mut self) {
        self.prev = false;
    }
}

/// Single-pulse handshake between two domains.
///
/// `send` runs on source-domain ticks, `step` on destination-domain ticks.
/// Latency is one to three destination ticks depending on relative phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulseCrossing {
    toggle: bool,
    sync0: bool,
    sync1: bool,
    sync2: bool,
}

impl PulseCrossing {
    /// Idle crossing.
    pub const fn new() -> Self {
        Self {
            toggle: false,
            sync0: false,
            sync1: false,
            sync2: false,
        }
    }

    /// Source domain: request one destination-tick pulse.
    pub fn send(&mut self) {
        self.toggle = !self.toggle;
    }

    /// Destination domain: advance the resample chain. Returns true for
    /// exactly one destination tick per source `send`.
    pub fn step(&mut self) -> bool {
        self.sync2 = self.sync1;
        self.sync1 = self.sync0;
        self.sync0 = self.toggle;
        self.sync1 != self.sync2
    }

    /// Drop any in-flight pulse and settle.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
