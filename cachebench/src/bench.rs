//! Warm-up and measurement sequencing, and the statistics derived from
//! the recorded timings.

use std::time::Instant;

use crate::client::{CacheClient, Result};
use crate::config::Config;
use crate::transport::Connector;
use crate::workload::{Op, Workload};

/// The figures of one benchmark run, immutable once computed.
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    /// How many requests the measured phase issued.
    pub num_requests: usize,
    /// Space the service reported after the warm-up phase.
    pub space_after_warmup: u64,
    /// Space the service reported at the end of the run.
    pub space_final: u64,
    /// Hits over issued GETs; `None` when the run issued no GETs.
    pub hit_rate: Option<f64>,
    /// The 95th-rank per-request latency, in milliseconds.
    pub p95_latency_ms: f64,
    /// Mean requests per second over the measured phase.
    pub throughput_rps: f64,
}

/// Drives a full run: warm-up, measured phase, statistics.
///
/// Warm-up issues `warmup_steps` SET requests from seeds `1..=W` to bring
/// the service to steady state; their timings are discarded. The measured
/// phase derives request `i` from seed `config.seed + i` and records its
/// wall-clock latency in generation order. Transport and protocol errors
/// abort the run.
pub fn run<C: Connector + Clone>(client: &CacheClient<C>, config: &Config) -> Result<BenchmarkResult> {
    let workload = Workload::new(config);

    tracing::info!(steps = config.warmup_steps, "warming up");
    for i in 1..=config.warmup_steps as u64 {
        let (key, value) = workload.set_sample(i);
        client.set(&key, &value, value.len())?;
    }
    let space_after_warmup = client.space_used()?;

    tracing::info!(requests = config.num_requests, seed = config.seed, "measuring");
    let mut measurements = Vec::with_capacity(config.num_requests);
    let mut hits = 0u64;
    let mut total_gets = 0u64;

    for i in 1..=config.num_requests as u64 {
        let sample = workload.sample(config.seed + i);

        let mut get_hit = None;
        let start = Instant::now();
        match sample.op {
            Op::Get => get_hit = Some(client.get(&sample.key)?),
            Op::Set => {
                let value = sample.value.as_deref().unwrap_or_default();
                client.set(&sample.key, value, value.len())?;
            }
            Op::Del => {
                client.del(&sample.key)?;
            }
        }
        measurements.push(start.elapsed().as_secs_f64() * 1000.0);

        if let Some(hit) = get_hit {
            total_gets += 1;
            if hit {
                hits += 1;
            }
        }
    }

    let space_final = client.space_used()?;

    Ok(BenchmarkResult {
        num_requests: config.num_requests,
        space_after_warmup,
        space_final,
        hit_rate: hit_rate(hits, total_gets),
        p95_latency_ms: p95(&measurements),
        throughput_rps: throughput(&measurements),
    })
}

/// Hit rate over the measured GETs; `None` when no GET was issued.
fn hit_rate(hits: u64, total_gets: u64) -> Option<f64> {
    (total_gets > 0).then(|| hits as f64 / total_gets as f64)
}

/// The value at the 95th rank of the measurements.
///
/// The rank is 1-based, `round(0.95 * n)` with halves rounding away from
/// zero, clamped to `[1, n]`; for the sequence `1..=100` this selects 95.
/// Percentile extraction works on a sorted copy, leaving the input order
/// untouched.
fn p95(measurements: &[f64]) -> f64 {
    if measurements.is_empty() {
        return 0.0;
    }
    let mut sorted = measurements.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = ((0.95 * sorted.len() as f64).round() as usize).clamp(1, sorted.len());
    sorted[rank - 1]
}

/// Mean requests per second over the unsorted measurement sequence.
fn throughput(measurements: &[f64]) -> f64 {
    if measurements.is_empty() {
        return 0.0;
    }
    let mean_ms = measurements.iter().sum::<f64>() / measurements.len() as f64;
    if mean_ms > 0.0 { 1000.0 / mean_ms } else { 0.0 }
}
