//! Diagnostic counters
//!
//! Free-running saturating counters for the host-visible diagnostics.
//! Saturation is deliberate: a counter that clamps at its maximum still
//! tells the host "at least this many", while a wrapped counter lies.

use crate::domain::Synchronous;
use crate::pulse::EdgeDetector;

/// Counter that clamps at `u16::MAX` instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SaturatingCounter {
    count: u16,
}

impl SaturatingCounter {
    /// Counter at zero.
    pub const fn new() -> Self {
        Self { count: 0 }
    }

    /// Count one occurrence.
    pub fn increment(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    /// Current count.
    pub const fn get(&self) -> u16 {
        self.count
    }

    /// Back to zero.
    pub fn clear(&mut self) {
        self.count = 0;
    }
}

/// Counts rising edges of a sampled level.
///
/// A level held high across consecutive ticks counts once; the counter
/// advances again only after the level has been seen low.
#[derive(Debug, Clone, Default)]
pub struct EdgeCounter {
    detect: EdgeDetector,
    count: SaturatingCounter,
}

impl EdgeCounter {
    /// Counter at zero.
    pub const fn new() -> Self {
        Self {
            detect: EdgeDetector::new(),
            count: SaturatingCounter::new(),
        }
    }

    /// Current count.
    pub const fn get(&self) -> u16 {
        self.count.get()
    }
}

impl Synchronous for EdgeCounter {
    type Input = bool;
    type Output = u16;

    fn step(&mut self, level: bool) -> u16 {
        if self.detect.step(level).rose {
            self.count.increment();
        }
        self.count.get()
    }

    fn reset(&mut self) {
        self.detect.reset();
        self.count.clear();
    }
}
