//! Measure a single pulse end to end and print what the host would see.

use tickgauge_core::Channel;
use tickgauge_sim::{TestBench, Waveform};

fn main() {
    let channel: Channel<64> = Channel::builder()
        .timeout_reload(0)
        .build()
        .expect("default configuration is valid");
    let mut bench = TestBench::new(channel);

    // Quiet line, one pulse five base ticks wide, quiet again
    bench.load(Waveform::new().low(32).high(20).low(8));
    bench.run_to_end(60);

    let hit = bench.hits().first().expect("the pulse produces one hit");
    println!("pulse width : {} sub-ticks", hit.duration);
    println!("timestamp   : {}", hit.timestamp);

    let diag = bench.channel.counters();
    println!(
        "edges seen  : {} rising, {} falling",
        diag.rising, diag.falling
    );
    println!(
        "recovery    : {} timeouts, {} aborts",
        diag.timeout, diag.abort
    );
    println!("queue drops : {}", bench.channel.dropped());

    let bin = hit.duration as usize;
    println!(
        "histogram   : bin {} holds {} count(s)",
        bin,
        bench.channel.bins()[bin]
    );
}
