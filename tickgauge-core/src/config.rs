//! Host-facing configuration and control registers
//!
//! Configuration is a plain struct passed by reference into each domain's
//! step function, so multiple channels instantiate independently. The host
//! may rewrite any field at any time; every stage samples the current value
//! on its own tick. There is deliberately no transactional atomicity with
//! in-flight measurements - a transition observes whatever configuration is
//! current at that instant.

use crate::constants::REBIN_SHIFT_MAX;
use crate::errors::{ConfigError, ConfigResult};

/// Which edge opens a measurement.
///
/// The opposite edge always closes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Polarity {
    /// Rising edge starts, falling edge stops.
    #[default]
    RisingIsStart = 0,
    /// Falling edge starts, rising edge stops.
    FallingIsStart = 1,
}

impl Polarity {
    /// Does a transition with these flags open a measurement?
    pub fn starts(self, rising: bool, falling: bool) -> bool {
        match self {
            Polarity::RisingIsStart => rising,
            Polarity::FallingIsStart => falling,
        }
    }

    /// Does a transition with these flags close a measurement?
    pub fn stops(self, rising: bool, falling: bool) -> bool {
        match self {
            Polarity::RisingIsStart => falling,
            Polarity::FallingIsStart => rising,
        }
    }

    /// True when the opening edge of this polarity is a falling edge.
    pub fn start_is_falling(self) -> bool {
        matches!(self, Polarity::FallingIsStart)
    }
}

/// Per-channel measurement configuration, sampled every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Capture enable. While clear, sampling holds neutral and nothing is
    /// emitted.
    pub enable: bool,
    /// Edge that opens a measurement.
    pub polarity: Polarity,
    /// Right shift applied to durations when addressing the histogram.
    pub rebin_shift: u8,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            enable: true,
            polarity: Polarity::RisingIsStart,
            rebin_shift: 0,
        }
    }
}

impl ChannelConfig {
    /// Set the rebin shift, rejecting shifts that would discard every
    /// duration bit.
    pub fn set_rebin_shift(&mut self, shift: u8) -> ConfigResult<()> {
        if shift > REBIN_SHIFT_MAX {
            return Err(ConfigError::RebinShiftTooLarge {
                shift,
                max: REBIN_SHIFT_MAX,
            });
        }
        self.rebin_shift = shift;
        Ok(())
    }
}

/// Direct host access to the histogram store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistogramAccess {
    /// Load the read-data register from `index_r` this tick.
    pub read: bool,
    /// Write `data_in` to `index_w` this tick.
    pub write: bool,
    /// Bin address for reads.
    pub index_r: u16,
    /// Bin address for writes.
    pub index_w: u16,
    /// Data for writes.
    pub data_in: u16,
}

/// Host control bits, sampled once per host-domain tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostControls {
    /// Route drained-hit increments into the histogram.
    pub go: bool,
    /// Run the zero-write address sweep. Ignored while `go` is set.
    pub clear: bool,
    /// Manual readout advance; the rising edge crosses into the processing
    /// domain as a single drain pulse.
    pub strobe: bool,
    /// Cancel the measurement currently waiting for its closing edge.
    pub abort: bool,
    /// Direct histogram access.
    pub access: HistogramAccess,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polarity_edge_roles() {
        let p = Polarity::RisingIsStart;
        assert!(p.starts(true, false));
        assert!(!p.starts(false, true));
        assert!(p.stops(false, true));

        let p = Polarity::FallingIsStart;
        assert!(p.starts(false, true));
        assert!(p.stops(true, false));
        assert!(p.start_is_falling());
    }

    #[test]
    fn rebin_shift_bounds() {
        let mut cfg = ChannelConfig::default();
        assert!(cfg.set_rebin_shift(15).is_ok());
        assert_eq!(cfg.rebin_shift, 15);

        let err = cfg.set_rebin_shift(16).unwrap_err();
        assert_eq!(
            err,
            ConfigError::RebinShiftTooLarge { shift: 16, max: 15 }
        );
        // Rejected writes leave the register untouched
        assert_eq!(cfg.rebin_shift, 15);
    }
}
