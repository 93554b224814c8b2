//! Measurement core for TickGauge
//!
//! Measures the width of pulses on a digital input line at sub-tick
//! resolution and accumulates the results into a bin histogram for host
//! readout. The pipeline is a chain of independently clocked stages joined
//! by explicit handoff primitives:
//!
//! ```text
//! line → Oversampler → classify → Capture → HandoffQueue → HitConverter
//!                                                              ↓
//!                                host read path ← Histogram ← increment
//! ```
//!
//! Key constraints:
//! - No heap allocation anywhere in the measurement path
//! - Every stage emits a defined output every tick; nothing blocks
//! - Back-pressure is flags only (queue fill, converter busy)
//!
//! ```no_run
//! use tickgauge_core::{Channel, HostControls};
//!
//! let mut channel: Channel<1024> = Channel::builder().build().unwrap();
//! let controls = HostControls { go: true, ..HostControls::default() };
//!
//! // Fast domain: one base tick worth of phase-offset line samples
//! channel.step_fast([false, true, true, true], 0);
//! // Processing and host domains advance on their own cadence
//! channel.step_proc();
//! channel.step_host(&controls);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Trace a state-machine transition through `log` when available.
#[cfg(feature = "log")]
macro_rules! sm_trace {
    ($($arg:tt)*) => { log::trace!($($arg)*) };
}
#[cfg(not(feature = "log"))]
macro_rules! sm_trace {
    ($($arg:tt)*) => {{}};
}

pub mod capture;
pub mod channel;
pub mod classify;
pub mod config;
pub mod constants;
pub mod convert;
pub mod counter;
pub mod domain;
pub mod errors;
pub mod histogram;
pub mod oversample;
pub mod pulse;
pub mod queue;
pub mod records;
pub mod time;

// Public API
pub use channel::{CaptureMode, Channel, ChannelBuilder, DiagCounters};
pub use config::{ChannelConfig, HistogramAccess, HostControls, Polarity};
pub use domain::Synchronous;
pub use errors::{ConfigError, ConfigResult};
pub use histogram::{Histogram, MemCommand};
pub use records::{HitRecord, IntervalRecord};
pub use time::CoarseTime;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
