//! Sweep pulse widths across all four phase alignments and render the
//! resulting histogram.

use tickgauge_core::Channel;
use tickgauge_sim::{TestBench, Waveform};

fn main() {
    let channel: Channel<64> = Channel::builder()
        .timeout_reload(0)
        .build()
        .expect("default configuration is valid");
    let mut bench = TestBench::new(channel);

    // Each width fired once per phase offset: identical widths should pile
    // into one bin regardless of where the pulse lands in the base tick
    let mut wave = Waveform::new().low(32);
    for width in [8usize, 8, 8, 8, 14, 14, 20, 20, 20] {
        for phase in 0..4 {
            wave = wave.low(phase).high(width).low(120 - phase);
        }
    }
    bench.load(wave);
    bench.run_to_end(100);

    println!("{} hits measured", bench.hits().len());
    for (bin, &count) in bench.channel.bins().iter().enumerate() {
        if count > 0 {
            println!("bin {:3} | {:16} {}", bin, "#".repeat(count as usize), count);
        }
    }

    let diag = bench.channel.counters();
    println!(
        "\nrising {} / falling {} / timeouts {} / drops {}",
        diag.rising,
        diag.falling,
        diag.timeout,
        bench.channel.dropped()
    );
}
