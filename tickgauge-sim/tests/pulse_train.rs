//! Property runs over randomized pulse trains

use proptest::prelude::*;

use tickgauge_core::Channel;
use tickgauge_sim::{TestBench, Waveform};

proptest! {
    /// Every pulse of a well-separated train measures exactly and in the
    /// order it arrived on the line.
    #[test]
    fn pulse_trains_measure_in_order(
        widths in proptest::collection::vec(1u32..=10, 1..=4),
        gap in 24u32..=48,
    ) {
        let channel: Channel<64> = Channel::builder().timeout_reload(0).build().unwrap();
        let mut bench = TestBench::new(channel);

        let mut wave = Waveform::new().low(32);
        for &w in &widths {
            wave = wave.high((w * 4) as usize).low((gap * 4) as usize);
        }
        bench.load(wave);
        bench.run_to_end(160);

        let durations: Vec<u16> = bench.hits().iter().map(|h| h.duration).collect();
        let expected: Vec<u16> = widths.iter().map(|&w| (w * 4) as u16).collect();
        prop_assert_eq!(durations, expected);
        prop_assert_eq!(bench.channel.dropped(), 0);
    }
}
