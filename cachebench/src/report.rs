//! Console report of a finished run.

use bytesize::ByteSize;
use yansi::Paint;

use crate::bench::BenchmarkResult;

/// Prints the final report, one line per figure, in fixed order.
pub fn print(result: &BenchmarkResult) {
    println!("{} {}", "Number of requests:".bold(), result.num_requests);
    println!(
        "{} {} ({})",
        "Space used (after warmup):".bold(),
        result.space_after_warmup,
        ByteSize::b(result.space_after_warmup),
    );
    println!(
        "{} {} ({})",
        "Space used (final):".bold(),
        result.space_final,
        ByteSize::b(result.space_final),
    );
    match result.hit_rate {
        Some(rate) => println!("{} {rate:.2}", "Hit rate:".bold()),
        None => println!("{} n/a", "Hit rate:".bold()),
    }
    println!("{} {:.3} ms", "p95 latency:".bold(), result.p95_latency_ms);
    println!("{} {:.0} req/s", "Mean throughput:".bold(), result.throughput_rps);
}
