//! Simulation support for TickGauge channels
//!
//! Models the execution environment the measurement core assumes: a set of
//! independently clocked domains advancing in discrete ticks, some at
//! integer multiples of others, some phase-offset copies of the same rate.
//! The crate provides:
//!
//! - [`clock`] - a deterministic multi-rate scheduler over a common
//!   sub-tick timebase
//! - [`stimulus`] - sub-tick-resolution waveform builders for driving the
//!   input line
//! - [`harness`] - a ready-made bench wiring a [`Channel`] to a waveform,
//!   a free-running time counter, and host controls
//!
//! [`Channel`]: tickgauge_core::Channel

pub mod clock;
pub mod harness;
pub mod stimulus;

pub use clock::{DomainSpec, Scheduler};
pub use harness::TestBench;
pub use stimulus::Waveform;
