// Summary statistics over the finite samples of a timeseries.
//
// Min/max/mean ride on trueno's SIMD vector ops; the median comes from
// aprender's DescriptiveStats quantile (R-7 with QuickSelect).

use aprender::stats::DescriptiveStats;
use serde::Serialize;
use trueno::Vector;

use super::{Result, StatsError, Timeseries};

/// Five-number-ish summary of one edge's observed latencies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencySummary {
    pub min_ms: f32,
    pub max_ms: f32,
    pub median_ms: f32,
    pub mean_ms: f32,
}

/// Summarize the finite samples of `ts`.
///
/// # Errors
///
/// `NoFiniteSamples` when every sample is unmatched.
pub fn summarize(ts: &Timeseries) -> Result<LatencySummary> {
    let finite: Vec<f32> = ts.finite_samples().iter().map(|&s| s as f32).collect();
    if finite.is_empty() {
        return Err(StatsError::NoFiniteSamples);
    }

    let v = Vector::from_slice(&finite);
    let min_ms = v.min().unwrap_or(0.0);
    let max_ms = v.max().unwrap_or(0.0);
    let mean_ms = v.mean().unwrap_or(0.0);

    let median_ms = DescriptiveStats::new(&v)
        .quantile(0.5)
        .map_err(|e| StatsError::Quantile(e.to_string()))?;

    Ok(LatencySummary {
        min_ms,
        max_ms,
        median_ms,
        mean_ms,
    })
}
