//! A ready-made bench around one channel
//!
//! [`TestBench`] wires a [`Channel`] to a [`Waveform`], a free-running
//! coarse time counter, and a host-control register, then drives the three
//! domains at configurable rate ratios over the shared sub-tick timebase.
//! Defaults mirror a typical deployment: the processing domain at half the
//! sampling rate and the host domain at a quarter.
//!
//! The bench collects every finalized hit so tests can assert on count,
//! order, duration and timestamp without poking at the channel mid-run.

use tickgauge_core::records::HitRecord;
use tickgauge_core::time::{FreeRunningTime, TimeSource};
use tickgauge_core::{Channel, HostControls};

use crate::clock::{DomainSpec, Scheduler};
use crate::stimulus::Waveform;

/// Default processing-domain period in sub-ticks.
pub const DEFAULT_PROC_PERIOD: u32 = 8;
/// Default host-domain period in sub-ticks.
pub const DEFAULT_HOST_PERIOD: u32 = 16;

/// Channel plus clocks, stimulus and host state.
pub struct TestBench<const BINS: usize> {
    /// The channel under test.
    pub channel: Channel<BINS>,
    /// Host control register, sampled on every host-domain tick.
    pub controls: HostControls,
    scheduler: Scheduler,
    fast: usize,
    proc: usize,
    host: usize,
    waveform: Waveform,
    time: FreeRunningTime,
    hits: Vec<HitRecord>,
}

impl<const BINS: usize> TestBench<BINS> {
    /// Bench with default domain ratios and `go` asserted.
    pub fn new(channel: Channel<BINS>) -> Self {
        Self::with_periods(channel, DEFAULT_PROC_PERIOD, DEFAULT_HOST_PERIOD)
    }

    /// Bench with explicit processing/host periods (in sub-ticks).
    pub fn with_periods(channel: Channel<BINS>, proc_period: u32, host_period: u32) -> Self {
        let mut scheduler = Scheduler::new();
        let fast = scheduler.add_domain(DomainSpec::new("fast", 4, 0));
        let proc = scheduler.add_domain(DomainSpec::new("proc", proc_period, 2));
        let host = scheduler.add_domain(DomainSpec::new("host", host_period, 3));

        Self {
            channel,
            controls: HostControls {
                go: true,
                ..HostControls::default()
            },
            scheduler,
            fast,
            proc,
            host,
            waveform: Waveform::new(),
            time: FreeRunningTime::new(),
            hits: Vec::new(),
        }
    }

    /// Replace the stimulus. The sub-tick cursor is the scheduler's, so a
    /// waveform loaded mid-run is indexed from absolute time zero.
    pub fn load(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Advance everything by `base_ticks` of the fast domain.
    pub fn run_base_ticks(&mut self, base_ticks: u64) {
        self.run_subticks(base_ticks * 4);
    }

    /// Advance everything by raw sub-ticks.
    pub fn run_subticks(&mut self, subticks: u64) {
        let Self {
            channel,
            controls,
            scheduler,
            fast,
            proc,
            host,
            waveform,
            time,
            hits,
        } = self;

        scheduler.run(subticks, |domain, subtick| {
            if domain == *fast {
                let samples = waveform.base_tick(subtick as usize);
                channel.step_fast(samples, time.now());
                time.step();
            } else if domain == *proc {
                if let Some(hit) = channel.step_proc() {
                    hits.push(hit);
                }
            } else if domain == *host {
                channel.step_host(controls);
            }
        });
    }

    /// Run until the loaded waveform is exhausted, plus `settle` base
    /// ticks for the pipeline to drain.
    pub fn run_to_end(&mut self, settle: u64) {
        let remaining = (self.waveform.len() as u64)
            .saturating_sub(self.scheduler.subtick())
            .div_ceil(4);
        self.run_base_ticks(remaining + settle);
    }

    /// Hits finalized so far, in production order.
    pub fn hits(&self) -> &[HitRecord] {
        &self.hits
    }

    /// Current coarse time.
    pub fn now(&self) -> u32 {
        self.time.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bench_collects_a_hit() {
        let channel: Channel<64> = Channel::builder().timeout_reload(0).build().unwrap();
        let mut bench = TestBench::new(channel);

        bench.load(Waveform::new().low(32).high(8).low(4));
        bench.run_to_end(40);

        assert_eq!(bench.hits().len(), 1);
        assert_eq!(bench.hits()[0].duration, 8);
    }
}
