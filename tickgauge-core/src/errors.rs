//! Error types for construction-time validation
//!
//! Nothing in the running pipeline is fatal: every state machine returns to
//! a known reset state on its own, and lost data surfaces only through the
//! diagnostic counters. Errors therefore exist solely for host-supplied
//! configuration that can be rejected before it takes effect.
//!
//! Errors are small, `Copy`, and heap-free so they can be returned from
//! register-write paths without allocation.

use thiserror_no_std::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Rejected host configuration.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Rebin shift would move every duration bit out of the address.
    #[error("rebin shift {shift} exceeds maximum {max}")]
    RebinShiftTooLarge {
        /// The requested shift.
        shift: u8,
        /// Largest shift that still addresses a bin.
        max: u8,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::RebinShiftTooLarge { shift, max } => {
                defmt::write!(fmt, "rebin shift {} exceeds maximum {}", shift, max)
            }
        }
    }
}
