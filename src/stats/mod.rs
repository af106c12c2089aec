// Latency statistics: raw sample sequences, binned distributions, and
// distribution composition by convolution.
//
// Timeseries keeps every correlated sample in capture order, with NaN standing
// in for invocations that produced no observable latency (lost message,
// uncorrelated scheduling). Histogram bins the finite samples and composes
// chained edges by discrete convolution of raw bin counts.
//
// Implementation:
// - Uses trueno (crates.io) for SIMD-optimized summary statistics
// - Uses aprender's DescriptiveStats for the median quantile
// - Convolution is implemented here; neither crate provides it

mod histogram;
mod summary;
mod timeseries;

pub use histogram::{Histogram, DEFAULT_BIN_WIDTH_MS, DEFAULT_MAX_BINS};
pub use summary::{summarize, LatencySummary};
pub use timeseries::Timeseries;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while building or composing latency statistics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    /// Every sample was NaN (or negative), leaving nothing to bin.
    #[error("no finite non-negative samples to build a histogram from")]
    NoFiniteSamples,

    /// The sample range would require more bins than the configured limit.
    #[error("histogram would need {required} bins, limit is {limit}")]
    BinCountExceeded { required: usize, limit: usize },

    /// A zero-sum bin sequence cannot be normalized.
    #[error("cannot normalize a histogram whose bins sum to zero")]
    DegenerateDistribution,

    /// Convolution requires all operands to share one bin width.
    #[error("histogram bin widths differ: {0} ms vs {1} ms")]
    BinWidthMismatch(f64, f64),

    /// `Histogram::sum` over zero histograms has no meaning.
    #[error("histogram composition over an empty input")]
    EmptyComposition,

    /// Quantile computation failed inside aprender.
    #[error("quantile computation failed: {0}")]
    Quantile(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;

/// How histogram bins are presented to report consumers.
///
/// Normalization is an explicit per-call choice. Stored bins always hold raw
/// counts; only `Histogram::display_bins` applies this config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Scale bins so they sum to 1.0.
    pub normalize: bool,
}
