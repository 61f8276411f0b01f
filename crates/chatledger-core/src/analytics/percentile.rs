//! Continuous percentiles over latency samples.

use chatledger_types::analytics::LatencyPercentiles;

/// Continuous percentile (linear interpolation between closest ranks) of an
/// ascending-sorted slice, the `percentile_cont` definition.
///
/// `fraction` is in `[0, 1]`. An empty slice yields 0.
pub fn percentile_cont(sorted: &[f64], fraction: f64) -> f64 {
    match sorted {
        [] => 0.0,
        [only] => *only,
        _ => {
            let rank = fraction.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// p50/p95/p99 of an ascending-sorted slice of latencies.
pub fn latency_percentiles(sorted: &[f64]) -> LatencyPercentiles {
    LatencyPercentiles {
        p50: percentile_cont(sorted, 0.50),
        p95: percentile_cont(sorted, 0.95),
        p99: percentile_cont(sorted, 0.99),
    }
}
