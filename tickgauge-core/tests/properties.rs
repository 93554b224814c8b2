//! Property tests for the accumulator and converter contracts

use proptest::prelude::*;

use tickgauge_core::config::Polarity;
use tickgauge_core::convert::{ConvertInput, HitConverter};
use tickgauge_core::histogram::{Histogram, MemCommand};
use tickgauge_core::oversample::SampleVector;
use tickgauge_core::queue::HandoffQueue;
use tickgauge_core::records::IntervalRecord;
use tickgauge_core::Synchronous;

fn read_back<const BINS: usize>(hist: &mut Histogram<BINS>, index: u16) -> u16 {
    hist.step(MemCommand::read(index));
    hist.data().unwrap()
}

proptest! {
    /// N consecutive increments to one address land exactly N counts.
    #[test]
    fn increments_are_lossless(initial in 0u16..1000, n in 1usize..200, addr in 0u16..32) {
        let mut hist = Histogram::<32>::new();
        hist.step(MemCommand::write(addr, initial));
        hist.step(MemCommand::default());

        for _ in 0..n {
            hist.step(MemCommand::increment(addr));
        }
        hist.step(MemCommand::default());

        prop_assert_eq!(read_back(&mut hist, addr), initial + n as u16);
    }

    /// Out-of-range increments behave exactly like increments of the last
    /// bin.
    #[test]
    fn clamp_is_equivalent_to_last_bin(addr in 32u16..u16::MAX, n in 1usize..50) {
        let mut clamped = Histogram::<32>::new();
        let mut direct = Histogram::<32>::new();

        for _ in 0..n {
            clamped.step(MemCommand::increment(addr));
            direct.step(MemCommand::increment(31));
        }
        clamped.step(MemCommand::default());
        direct.step(MemCommand::default());

        prop_assert_eq!(clamped.as_slice(), direct.as_slice());
    }

    /// Durations at or past the saturation limit encode as the marker;
    /// everything below passes through scaled.
    #[test]
    fn duration_saturates_never_wraps(diff in 1u32..0x8000) {
        let mut conv = HitConverter::new(0);
        let start = IntervalRecord {
            is_rising: true,
            is_falling: false,
            coarse_time: 100,
            sample: Some(SampleVector::from_raw(0b1111)),
        };
        let stop = IntervalRecord {
            is_rising: false,
            is_falling: true,
            coarse_time: 100u32.wrapping_add(diff),
            sample: Some(SampleVector::from_raw(0b0000)),
        };

        let mut feed = |record| {
            conv.step(ConvertInput {
                record,
                polarity: Polarity::RisingIsStart,
                abort: false,
            })
            .hit
        };
        feed(None);
        feed(Some(start));
        feed(Some(stop));
        let hit = feed(None).unwrap();

        if diff >= 0x3fff {
            prop_assert_eq!(hit.duration, 0xffff);
        } else {
            prop_assert_eq!(hit.duration as u32, diff << 2);
        }
    }

    /// Whatever fits in the queue comes out in production order.
    #[test]
    fn handoff_preserves_order(words in proptest::collection::vec(any::<u64>(), 1..15)) {
        let queue = HandoffQueue::<u64, 16>::new();
        for &w in &words {
            prop_assert!(queue.push(w));
        }
        let drained: Vec<u64> = queue.drain().collect();
        prop_assert_eq!(drained, words);
    }

    /// A record survives the packed queue transport bit-exactly.
    #[test]
    fn packed_transport_is_faithful(
        rising in any::<bool>(),
        falling in any::<bool>(),
        time in any::<u32>(),
        sample in proptest::option::of(0u8..16),
    ) {
        let record = IntervalRecord {
            is_rising: rising,
            is_falling: falling,
            coarse_time: time,
            sample: sample.map(SampleVector::from_raw),
        };
        prop_assert_eq!(IntervalRecord::unpack(record.pack()), record);
    }
}
