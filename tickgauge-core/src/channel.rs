//! Channel orchestration across the three clock domains
//!
//! ## Overview
//!
//! A [`Channel`] wires the whole measurement pipeline together and exposes
//! one step entry point per execution context:
//!
//! ```text
//! fast domain     step_fast()  oversampler → capture → queue producer
//! processing      step_proc()  drain gate → converter → increment request
//! host domain     step_host()  histogram port routing + host registers
//! ```
//!
//! Control bits cross between domains only through the pulse handshake:
//! the host `strobe` and `abort` edges cross into the processing domain,
//! increment requests cross into the host domain and are acknowledged
//! back, releasing the in-flight flag. Words cross only through the
//! handoff queue.
//!
//! ## Drain gating
//!
//! Records are drained in start/stop pairs. The generator edge-detects the
//! converter's `busy` flag and re-arms on its falling edge, then waits for
//! the queue to hold a complete pair before issuing the two drain pulses
//! with a gap tick between them, matching the converter's cadence. While
//! the converter is busy, queued records instead drain one at a time so
//! the measurement in flight always receives its closing record, even
//! after a stray transition has shifted pair alignment. A host strobe
//! advances a single record by hand, which is how an unpaired trailing
//! start gets flushed into the watchdog.
//!
//! ## Histogram routing
//!
//! While `go` is set, drained-hit increments own the mutation port.
//! Saturated durations mark out-of-range measurements and are not
//! histogrammed. With `go` clear and `clear` set, the zero-write sweep
//! walks the address space one bin per host tick, wrapping at the last
//! bin. Host reads pass through on every tick regardless; only actual
//! mutation serializes.

use heapless::HistoryBuffer;

use crate::capture::{CaptureOutput, FineCapture, FineCaptureInput, SimpleCapture, SimpleCaptureInput};
use crate::config::{ChannelConfig, HostControls, Polarity};
use crate::constants::{DURATION_SATURATED, HANDOFF_DEPTH, RECENT_HITS, TIMEOUT_RELOAD};
use crate::convert::{ConvertInput, HitConverter};
use crate::domain::Synchronous;
use crate::errors::ConfigResult;
use crate::histogram::{Histogram, MemCommand};
use crate::oversample::Oversampler;
use crate::pulse::{EdgeDetector, PulseCrossing};
use crate::queue::HandoffQueue;
use crate::records::{HitRecord, IntervalRecord};
use crate::time::CoarseTime;

/// Which capture front end a channel runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Oversampled capture with sub-tick resolution.
    #[default]
    Fine,
    /// Whole-tick capture without the oversampling front end.
    Simple,
}

#[derive(Debug, Clone)]
enum CaptureKind {
    Fine(FineCapture),
    Simple(SimpleCapture),
}

/// Snapshot of the diagnostic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiagCounters {
    /// Rising records seen by the converter.
    pub rising: u16,
    /// Falling records seen by the converter.
    pub falling: u16,
    /// Watchdog expiries.
    pub timeout: u16,
    /// Honored host aborts.
    pub abort: u16,
}

/// Drain pulse generator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DrainState {
    /// Settling tick after a sequence.
    #[default]
    Reset,
    /// Waiting for a full pair (or a host strobe).
    WaitFifo,
    /// Gap tick between the two drains of a pair.
    Gap,
    /// Second drain of the pair.
    SecondDrain,
}

/// One measurement channel: capture, handoff, conversion, histogram.
pub struct Channel<const BINS: usize> {
    /// Live configuration, sampled by every domain on its own tick.
    pub config: ChannelConfig,

    // Fast domain
    sampler: Oversampler,
    capture: CaptureKind,
    last_width: Option<u32>,

    // Word handoff, fast -> processing
    queue: HandoffQueue<u64, HANDOFF_DEPTH>,

    // Processing domain
    converter: HitConverter,
    drain: DrainState,
    busy_edge: EdgeDetector,
    drain_armed: bool,
    incr_busy: bool,
    incr_addr: u16,
    last_hit: Option<HitRecord>,
    recent: HistoryBuffer<HitRecord, RECENT_HITS>,

    // Host domain
    histogram: Histogram<BINS>,
    sweep_addr: u16,
    strobe_edge: EdgeDetector,
    abort_edge: EdgeDetector,
    clear_edge: EdgeDetector,

    // Pulse crossings
    strobe_xing: PulseCrossing, // host -> processing
    abort_xing: PulseCrossing,  // host -> processing
    incr_xing: PulseCrossing,   // processing -> host
    ack_xing: PulseCrossing,    // host -> processing
}

impl<const BINS: usize> Channel<BINS> {
    /// Start building a channel.
    pub fn builder() -> ChannelBuilder<BINS> {
        ChannelBuilder::new()
    }

    /// One fast-domain tick: four sub-tick line samples plus the external
    /// coarse time counter.
    pub fn step_fast(&mut self, subticks: [bool; 4], time: CoarseTime) {
        let vector = self.sampler.step(subticks);
        let config = self.config;
        let CaptureOutput { record, width } = match &mut self.capture {
            CaptureKind::Fine(cap) => cap.step(FineCaptureInput {
                vector,
                time,
                config,
            }),
            CaptureKind::Simple(cap) => cap.step(SimpleCaptureInput {
                line: subticks[0],
                time,
                config,
            }),
        };

        if let Some(record) = record {
            // Full queue drops the record; the queue counts it
            let _ = self.queue.push(record.pack());
        }
        if width.is_some() {
            self.last_width = width;
        }
    }

    /// One processing-domain tick. Returns the hit finalized this tick,
    /// if any.
    pub fn step_proc(&mut self) -> Option<HitRecord> {
        let strobe_pulse = self.strobe_xing.step();
        let abort_pulse = self.abort_xing.step();
        if self.ack_xing.step() {
            self.incr_busy = false;
        }

        // Re-arm the drain generator on busy's falling edge
        let busy_ev = self.busy_edge.step(self.converter.busy());
        if busy_ev.rose {
            self.drain_armed = false;
        }
        if busy_ev.fell {
            self.drain_armed = true;
        }

        let idle = self.drain_armed && !self.converter.busy() && !self.incr_busy;
        let mut drained = None;
        match self.drain {
            DrainState::Reset => {
                self.drain = DrainState::WaitFifo;
            }
            DrainState::WaitFifo => {
                if self.converter.busy() && !self.incr_busy && !self.queue.is_empty() {
                    // Completion drain: the in-flight measurement is owed
                    // its closing record, one at a time
                    drained = self.queue.pop();
                    self.drain = DrainState::Reset;
                } else if idle && self.queue.len() >= 2 {
                    drained = self.queue.pop();
                    self.drain = DrainState::Gap;
                } else if idle && strobe_pulse && !self.queue.is_empty() {
                    // Manual advance: one record only
                    drained = self.queue.pop();
                    self.drain = DrainState::Reset;
                }
            }
            DrainState::Gap => {
                self.drain = DrainState::SecondDrain;
            }
            DrainState::SecondDrain => {
                drained = self.queue.pop();
                self.drain = DrainState::Reset;
            }
        }

        let record = drained.map(IntervalRecord::unpack);
        let out = self.converter.step(ConvertInput {
            record,
            polarity: self.config.polarity,
            abort: abort_pulse,
        });

        if let Some(hit) = out.hit {
            self.last_hit = Some(hit);
            self.recent.write(hit);
            if hit.duration != DURATION_SATURATED {
                // Hold the address stable until the host domain has taken
                // the increment; busy gates any further hit this long
                self.incr_addr = hit.duration >> self.config.rebin_shift;
                self.incr_busy = true;
                self.incr_xing.send();
            } else {
                sm_trace!("channel: saturated hit not histogrammed");
            }
        }

        out.hit
    }

    /// One host-domain tick: histogram port routing and control sampling.
    pub fn step_host(&mut self, ctrl: &HostControls) {
        if self.strobe_edge.step(ctrl.strobe).rose {
            self.strobe_xing.send();
        }
        if self.abort_edge.step(ctrl.abort).rose {
            self.abort_xing.send();
        }
        if self.clear_edge.step(ctrl.clear).rose {
            self.sweep_addr = 0;
        }

        let incr_pulse = self.incr_xing.step();

        let mut cmd = MemCommand::default();
        if incr_pulse && ctrl.go {
            cmd.increment = true;
            cmd.index_w = self.incr_addr;
        } else if ctrl.clear && !ctrl.go {
            cmd.write = true;
            cmd.index_w = self.sweep_addr;
            cmd.data_in = 0;
            self.sweep_addr = if self.sweep_addr as usize >= BINS - 1 {
                0
            } else {
                self.sweep_addr + 1
            };
        } else if ctrl.access.write {
            cmd.write = true;
            cmd.index_w = ctrl.access.index_w;
            cmd.data_in = ctrl.access.data_in;
        }

        // Reads never serialize against the mutation path
        cmd.read = ctrl.access.read;
        cmd.index_r = ctrl.access.index_r;

        self.histogram.step(cmd);

        if incr_pulse {
            self.ack_xing.send();
        }
    }

    /// Converter busy flag.
    pub fn busy(&self) -> bool {
        self.converter.busy()
    }

    /// Converter ready flag.
    pub fn rdy(&self) -> bool {
        self.converter.rdy()
    }

    /// Handoff queue fill level.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Records dropped at the handoff queue since power-on.
    pub fn dropped(&self) -> u32 {
        self.queue
            .stats()
            .dropped
            .load(core::sync::atomic::Ordering::Relaxed)
    }

    /// Diagnostic counter snapshot.
    pub fn counters(&self) -> DiagCounters {
        DiagCounters {
            rising: self.converter.rising_count(),
            falling: self.converter.falling_count(),
            timeout: self.converter.timeout_count(),
            abort: self.converter.abort_count(),
        }
    }

    /// Histogram read-data register; `WouldBlock` until a host read has
    /// completed.
    pub fn data(&self) -> nb::Result<u16, core::convert::Infallible> {
        self.histogram.data()
    }

    /// Raw histogram read-data bus.
    pub fn data_bus(&self) -> u16 {
        self.histogram.data_bus()
    }

    /// Debug/test view of the histogram counters.
    pub fn bins(&self) -> &[u16] {
        self.histogram.as_slice()
    }

    /// Most recent finalized hit.
    pub fn last_hit(&self) -> Option<HitRecord> {
        self.last_hit
    }

    /// Raw width published by the capture stage for the last completed
    /// interval, in sub-tick units.
    pub fn last_width(&self) -> Option<u32> {
        self.last_width
    }

    /// Recent hits, oldest first.
    pub fn recent_hits(&self) -> impl Iterator<Item = &HitRecord> {
        self.recent.oldest_ordered()
    }

    /// Return every stage to its power-on state. Configuration is kept.
    pub fn reset(&mut self) {
        self.sampler.reset();
        match &mut self.capture {
            CaptureKind::Fine(cap) => cap.reset(),
            CaptureKind::Simple(cap) => cap.reset(),
        }
        self.queue.clear();
        self.converter.reset();
        self.histogram.reset();

        self.drain = DrainState::Reset;
        self.busy_edge.reset();
        self.drain_armed = true;
        self.incr_busy = false;
        self.incr_addr = 0;
        self.last_hit = None;
        self.last_width = None;
        self.recent.clear();

        self.sweep_addr = 0;
        self.strobe_edge.reset();
        self.abort_edge.reset();
        self.clear_edge.reset();

        self.strobe_xing.reset();
        self.abort_xing.reset();
        self.incr_xing.reset();
        self.ack_xing.reset();
    }
}

/// Builder for [`Channel`], validating host configuration up front.
#[derive(Debug, Clone)]
pub struct ChannelBuilder<const BINS: usize> {
    config: ChannelConfig,
    rebin_shift: u8,
    timeout_reload: u16,
    mode: CaptureMode,
}

impl<const BINS: usize> Default for ChannelBuilder<BINS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const BINS: usize> ChannelBuilder<BINS> {
    /// Builder with default configuration: fine capture, rising starts,
    /// watchdog at full reload.
    pub fn new() -> Self {
        Self {
            config: ChannelConfig::default(),
            rebin_shift: 0,
            timeout_reload: TIMEOUT_RELOAD,
            mode: CaptureMode::Fine,
        }
    }

    /// Edge that opens a measurement.
    pub fn polarity(mut self, polarity: Polarity) -> Self {
        self.config.polarity = polarity;
        self
    }

    /// Initial capture enable.
    pub fn enable(mut self, enable: bool) -> Self {
        self.config.enable = enable;
        self
    }

    /// Duration right-shift for histogram addressing. Validated at build.
    pub fn rebin_shift(mut self, shift: u8) -> Self {
        self.rebin_shift = shift;
        self
    }

    /// Watchdog window in processing ticks; zero disables it.
    pub fn timeout_reload(mut self, reload: u16) -> Self {
        self.timeout_reload = reload;
        self
    }

    /// Capture front end variant.
    pub fn mode(mut self, mode: CaptureMode) -> Self {
        self.mode = mode;
        self
    }

    /// Construct the channel.
    pub fn build(self) -> ConfigResult<Channel<BINS>> {
        let mut config = self.config;
        config.set_rebin_shift(self.rebin_shift)?;

        let capture = match self.mode {
            CaptureMode::Fine => CaptureKind::Fine(FineCapture::new()),
            CaptureMode::Simple => CaptureKind::Simple(SimpleCapture::new()),
        };

        Ok(Channel {
            config,
            sampler: Oversampler::new(),
            capture,
            last_width: None,
            queue: HandoffQueue::new(),
            converter: HitConverter::new(self.timeout_reload),
            drain: DrainState::Reset,
            busy_edge: EdgeDetector::new(),
            drain_armed: true,
            incr_busy: false,
            incr_addr: 0,
            last_hit: None,
            recent: HistoryBuffer::new(),
            histogram: Histogram::new(),
            sweep_addr: 0,
            strobe_edge: EdgeDetector::new(),
            abort_edge: EdgeDetector::new(),
            clear_edge: EdgeDetector::new(),
            strobe_xing: PulseCrossing::new(),
            abort_xing: PulseCrossing::new(),
            incr_xing: PulseCrossing::new(),
            ack_xing: PulseCrossing::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigError;

    fn host_idle() -> HostControls {
        HostControls {
            go: true,
            ..HostControls::default()
        }
    }

    /// Step the channel with domain ratios 1:2:2 until `fast_ticks` have
    /// elapsed, feeding a flat line.
    fn run_flat<const BINS: usize>(
        ch: &mut Channel<BINS>,
        ctrl: &HostControls,
        fast_ticks: u32,
        start_time: CoarseTime,
    ) -> CoarseTime {
        let mut time = start_time;
        for t in 0..fast_ticks {
            ch.step_fast([false; 4], time);
            time = time.wrapping_add(1);
            if t % 2 == 0 {
                ch.step_proc();
                ch.step_host(ctrl);
            }
        }
        time
    }

    #[test]
    fn builder_rejects_bad_rebin() {
        let result = Channel::<64>::builder().rebin_shift(16).build();
        assert_eq!(
            result.err(),
            Some(ConfigError::RebinShiftTooLarge { shift: 16, max: 15 })
        );
    }

    #[test]
    fn pulse_reaches_histogram() {
        let mut ch: Channel<64> = Channel::builder().timeout_reload(0).build().unwrap();
        let ctrl = host_idle();

        let mut time = 0;
        // Warm up, pulse 3 base ticks wide, then settle
        time = run_flat(&mut ch, &ctrl, 8, time);
        for _ in 0..3 {
            ch.step_fast([true; 4], time);
            time = time.wrapping_add(1);
        }
        run_flat(&mut ch, &ctrl, 40, time);

        let hit = ch.last_hit().expect("one pulse, one hit");
        assert_eq!(hit.duration, 12); // 3 base ticks * 4 sub-ticks
        // The capture stage published the same raw width
        assert_eq!(ch.last_width(), Some(12));
        assert_eq!(ch.counters().rising, 1);
        assert_eq!(ch.counters().falling, 1);
        assert_eq!(ch.bins()[12], 1);
        assert_eq!(ch.dropped(), 0);
    }

    #[test]
    fn rebin_shift_scales_addressing() {
        let mut ch: Channel<64> = Channel::builder()
            .timeout_reload(0)
            .rebin_shift(2)
            .build()
            .unwrap();
        let ctrl = host_idle();

        let mut time = 0;
        time = run_flat(&mut ch, &ctrl, 8, time);
        for _ in 0..3 {
            ch.step_fast([true; 4], time);
            time = time.wrapping_add(1);
        }
        run_flat(&mut ch, &ctrl, 40, time);

        // duration 12 >> 2 = bin 3
        assert_eq!(ch.bins()[3], 1);
    }

    #[test]
    fn simple_mode_measures_whole_ticks() {
        let mut ch: Channel<64> = Channel::builder()
            .timeout_reload(0)
            .mode(CaptureMode::Simple)
            .build()
            .unwrap();
        let ctrl = host_idle();

        let mut time = 0;
        time = run_flat(&mut ch, &ctrl, 8, time);
        for _ in 0..3 {
            ch.step_fast([true; 4], time);
            time = time.wrapping_add(1);
        }
        run_flat(&mut ch, &ctrl, 40, time);

        let hit = ch.last_hit().expect("simple capture still pairs edges");
        assert_eq!(hit.duration, 3); // whole base ticks, no sub-tick term
        assert_eq!(ch.bins()[3], 1);
    }

    #[test]
    fn go_clear_blocks_increments() {
        let mut ch: Channel<64> = Channel::builder().timeout_reload(0).build().unwrap();
        let ctrl = HostControls::default(); // go clear

        let mut time = 0;
        time = run_flat(&mut ch, &ctrl, 8, time);
        for _ in 0..2 {
            ch.step_fast([true; 4], time);
            time = time.wrapping_add(1);
        }
        run_flat(&mut ch, &ctrl, 40, time);

        // The hit exists but never reached the histogram
        assert!(ch.last_hit().is_some());
        assert!(ch.bins().iter().all(|&b| b == 0));
    }

    #[test]
    fn clear_sweep_zeroes_every_bin() {
        let mut ch: Channel<16> = Channel::builder().build().unwrap();

        // Preload through the host write path
        for i in 0..16u16 {
            let ctrl = HostControls {
                access: crate::config::HistogramAccess {
                    write: true,
                    index_w: i,
                    data_in: i + 1,
                    ..Default::default()
                },
                ..Default::default()
            };
            ch.step_host(&ctrl);
        }
        assert!(ch.bins().iter().all(|&b| b != 0));

        let ctrl = HostControls {
            clear: true,
            ..HostControls::default()
        };
        for _ in 0..16 {
            ch.step_host(&ctrl);
        }
        assert!(ch.bins().iter().all(|&b| b == 0));
    }

    #[test]
    fn host_read_path_has_latency() {
        let mut ch: Channel<16> = Channel::builder().build().unwrap();
        assert!(ch.data().is_err());

        let write = HostControls {
            access: crate::config::HistogramAccess {
                write: true,
                index_w: 5,
                data_in: 99,
                ..Default::default()
            },
            ..Default::default()
        };
        ch.step_host(&write);

        let read = HostControls {
            access: crate::config::HistogramAccess {
                read: true,
                index_r: 5,
                ..Default::default()
            },
            ..Default::default()
        };
        ch.step_host(&read);
        assert_eq!(ch.data().unwrap(), 99);
    }

    #[test]
    fn reset_returns_to_power_on() {
        let mut ch: Channel<64> = Channel::builder().timeout_reload(0).build().unwrap();
        let ctrl = host_idle();

        let mut time = 0;
        time = run_flat(&mut ch, &ctrl, 8, time);
        for _ in 0..2 {
            ch.step_fast([true; 4], time);
            time = time.wrapping_add(1);
        }
        run_flat(&mut ch, &ctrl, 40, time);
        assert!(ch.last_hit().is_some());

        ch.reset();
        assert!(ch.last_hit().is_none());
        assert_eq!(ch.queue_len(), 0);
        assert_eq!(ch.counters(), DiagCounters::default());
        assert!(ch.bins().iter().all(|&b| b == 0));
        assert!(!ch.busy());
    }
}
