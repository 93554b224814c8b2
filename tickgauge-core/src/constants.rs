//! Constants for the TickGauge core
//!
//! Centralized numeric constants used throughout the measurement pipeline.
//! Values that encode wire formats or hardware-like behavior are documented
//! with the layout they belong to.

/// Sub-tick samples taken per base tick.
///
/// The sampling front end captures the line at four phase offsets
/// (0/90/180/270 degrees), so one base tick resolves into four sub-ticks.
/// Fixed at build time; the fine duration math assumes it.
pub const OVERSAMPLE_FACTOR: u32 = 4;

/// Base ticks between a line sample and the aligned vector that contains it.
///
/// The phase-local shift chains retime all four captures into the base
/// domain; the merged vector lags the line by this many base ticks.
pub const PIPELINE_ALIGN_TICKS: u32 = 3;

/// Coarse diff at or above which a duration encodes as saturated.
pub const DURATION_SATURATION_LIMIT: u32 = 0x3fff;

/// Encoded duration for a saturated measurement. Never produced by an
/// in-range interval, so hosts can treat it as "out of range".
pub const DURATION_SATURATED: u16 = 0xffff;

/// Capacity of the cross-domain handoff queue. Must be a power of two.
pub const HANDOFF_DEPTH: usize = 16;

/// Default reload value for the converter's end-of-interval watchdog.
/// A reload of zero disables the watchdog entirely.
pub const TIMEOUT_RELOAD: u16 = 0xffff;

/// Largest accepted rebin shift. Durations are 16 bits wide, so shifting
/// further would always address bin zero.
pub const REBIN_SHIFT_MAX: u8 = 15;

/// Depth of the channel's host-visible record of recent hits.
pub const RECENT_HITS: usize = 8;
