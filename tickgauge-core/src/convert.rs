//! Interval-to-record conversion in the processing domain
//!
//! ## Overview
//!
//! The converter drains transition records from the handoff queue and turns
//! matched start/stop pairs into [`HitRecord`]s:
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            ↓                              │
//! Reset → WaitStart → WaitEnd → ReadyPulse ─┘
//!                        │ ├──→ Timeout ──→ Reset
//!                        │ └──→ Abort ────→ Reset
//! ```
//!
//! `WaitEnd` carries a countdown watchdog reloaded on every accepted start;
//! reaching zero discards the pending interval so one lost stop edge can
//! never wedge the pipeline. A host abort is sampled the same way and takes
//! its own branch with the same discard semantics. Both outcomes, plus
//! every rising and falling record seen, tick a saturating diagnostic
//! counter exactly once.
//!
//! `busy` is asserted throughout `WaitEnd` so the orchestrator can avoid
//! starting a drain that would land mid-measurement. `ReadyPulse` presents
//! the hit for exactly one tick.
//!
//! ## Duration encoding
//!
//! The coarse difference is width-wrapping. A difference at or beyond
//! [`DURATION_SATURATION_LIMIT`](crate::constants::DURATION_SATURATION_LIMIT)
//! encodes as the saturated marker; otherwise records carrying sample
//! snapshots fold in the sub-tick correction
//! `4*diff + fine_end - fine_start`, and snapshot-free records pass the
//! coarse difference through.

use crate::config::Polarity;
use crate::constants::{DURATION_SATURATED, DURATION_SATURATION_LIMIT, TIMEOUT_RELOAD};
use crate::counter::{EdgeCounter, SaturatingCounter};
use crate::domain::Synchronous;
use crate::records::{HitRecord, IntervalRecord};
use crate::time::CoarseTime;

/// Converter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvertState {
    /// Clearing flags for one tick.
    #[default]
    Reset,
    /// Waiting for a record with the opening polarity.
    WaitStart,
    /// Start accepted; waiting for the closing record, watchdog running.
    WaitEnd,
    /// Hit presented for this one tick.
    ReadyPulse,
    /// Watchdog expired; pending interval discarded.
    Timeout,
    /// Host abort honored; pending interval discarded.
    Abort,
}

/// Inputs sampled by one converter tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertInput {
    /// Record drained from the handoff queue this tick, if any.
    pub record: Option<IntervalRecord>,
    /// Edge that opens a measurement.
    pub polarity: Polarity,
    /// Host cancellation request.
    pub abort: bool,
}

/// Output of one converter tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOutput {
    /// Finalized measurement, present during `ReadyPulse` only.
    pub hit: Option<HitRecord>,
}

/// Start/stop matcher with watchdog and diagnostics.
#[derive(Debug, Clone)]
pub struct HitConverter {
    state: ConvertState,
    start_time: CoarseTime,
    start_fine: u8,
    start_has_sample: bool,
    timestamp: u16,
    pending: HitRecord,
    end_timeout: u16,
    timeout_reload: u16,
    busy: bool,
    rdy: bool,
    rdy_pulse: bool,
    rising_seen: EdgeCounter,
    falling_seen: EdgeCounter,
    timeouts: SaturatingCounter,
    aborts: SaturatingCounter,
}

impl Default for HitConverter {
    fn default() -> Self {
        Self::new(TIMEOUT_RELOAD)
    }
}

impl HitConverter {
    /// Converter with the given watchdog window. Zero disables the
    /// watchdog: an unmatched start then waits forever.
    pub const fn new(timeout_reload: u16) -> Self {
        Self {
            state: ConvertState::Reset,
            start_time: 0,
            start_fine: 0,
            start_has_sample: false,
            timestamp: 0,
            pending: HitRecord {
                duration: 0,
                timestamp: 0,
            },
            end_timeout: 0,
            timeout_reload,
            busy: false,
            rdy: false,
            rdy_pulse: false,
            rising_seen: EdgeCounter::new(),
            falling_seen: EdgeCounter::new(),
            timeouts: SaturatingCounter::new(),
            aborts: SaturatingCounter::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> ConvertState {
        self.state
    }

    /// Measurement in flight; drains would land mid-interval.
    pub fn busy(&self) -> bool {
        self.busy
    }

    /// A hit was presented on the last `ReadyPulse` tick.
    pub fn rdy(&self) -> bool {
        self.rdy
    }

    /// Single-tick companion to `rdy`.
    pub fn rdy_pulse(&self) -> bool {
        self.rdy_pulse
    }

    /// Rising records seen.
    pub fn rising_count(&self) -> u16 {
        self.rising_seen.get()
    }

    /// Falling records seen.
    pub fn falling_count(&self) -> u16 {
        self.falling_seen.get()
    }

    /// Watchdog expiries.
    pub fn timeout_count(&self) -> u16 {
        self.timeouts.get()
    }

    /// Honored host aborts.
    pub fn abort_count(&self) -> u16 {
        self.aborts.get()
    }

    fn encode_duration(&self, record: &IntervalRecord, stop_is_falling: bool) -> u16 {
        let diff = record.coarse_time.wrapping_sub(self.start_time);
        if diff >= DURATION_SATURATION_LIMIT {
            return DURATION_SATURATED;
        }
        match record.fine_offset(stop_is_falling) {
            Some(fine_end) if self.start_has_sample => (diff << 2)
                .wrapping_add(fine_end as u32)
                .wrapping_sub(self.start_fine as u32)
                as u16,
            _ => diff as u16,
        }
    }
}

impl Synchronous for HitConverter {
    type Input = ConvertInput;
    type Output = ConvertOutput;

    fn step(&mut self, input: ConvertInput) -> ConvertOutput {
        let (is_rising, is_falling) = input
            .record
            .map(|r| (r.is_rising, r.is_falling))
            .unwrap_or((false, false));
        self.rising_seen.step(is_rising);
        self.falling_seen.step(is_falling);

        if self.end_timeout > 0 {
            self.end_timeout -= 1;
        }

        let mut output = ConvertOutput::default();
        match self.state {
            ConvertState::Reset => {
                self.busy = false;
                self.rdy = false;
                self.rdy_pulse = false;
                self.state = ConvertState::WaitStart;
            }
            ConvertState::WaitStart => {
                if let Some(record) = input.record {
                    if input.polarity.starts(record.is_rising, record.is_falling) {
                        self.start_time = record.coarse_time;
                        self.start_has_sample = record.sample.is_some();
                        self.start_fine = record
                            .fine_offset(input.polarity.start_is_falling())
                            .unwrap_or(0);
                        self.timestamp = record.coarse_time as u16;
                        self.end_timeout = self.timeout_reload;
                        self.busy = true;
                        self.state = ConvertState::WaitEnd;
                    }
                }
            }
            ConvertState::WaitEnd => {
                self.busy = true;
                if self.timeout_reload > 0 && self.end_timeout == 0 {
                    // Watchdog wins over a stop arriving this same tick
                    self.state = ConvertState::Timeout;
                } else if input.abort {
                    self.state = ConvertState::Abort;
                } else if let Some(record) = input.record {
                    if input.polarity.stops(record.is_rising, record.is_falling) {
                        let stop_is_falling = !input.polarity.start_is_falling();
                        self.pending = HitRecord {
                            duration: self.encode_duration(&record, stop_is_falling),
                            timestamp: self.timestamp,
                        };
                        self.state = ConvertState::ReadyPulse;
                    }
                }
            }
            ConvertState::ReadyPulse => {
                self.busy = false;
                self.rdy = true;
                self.rdy_pulse = true;
                output.hit = Some(self.pending);
                self.state = ConvertState::Reset;
            }
            ConvertState::Timeout => {
                self.busy = false;
                self.timeouts.increment();
                sm_trace!("hit converter: watchdog expired, interval discarded");
                self.state = ConvertState::Reset;
            }
            ConvertState::Abort => {
                self.busy = false;
                self.aborts.increment();
                sm_trace!("hit converter: abort honored, interval discarded");
                self.state = ConvertState::Reset;
            }
        }

        output
    }

    fn reset(&mut self) {
        let reload = self.timeout_reload;
        *self = Self::new(reload);
    }
}
