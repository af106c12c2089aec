//! Binned latency distributions and their composition.
//!
//! A `Histogram` holds raw per-bin counts over fixed-width bins starting at
//! zero. Trailing all-zero bins are always trimmed, so the last bin of a
//! non-empty histogram is populated. Chained edges compose by discrete
//! convolution of their raw bin sequences: the distribution of a sum of
//! independent latencies is the convolution of the individual distributions.
//!
//! # Example
//!
//! ```
//! use cadena::stats::{DisplayConfig, Histogram};
//!
//! let a = Histogram::from_raw_bins(vec![1.0, 1.0], 1.0);
//! let b = Histogram::from_raw_bins(vec![1.0, 1.0], 1.0);
//!
//! let sum = Histogram::sum(&[&a, &b]).unwrap();
//! assert_eq!(sum.bins(), &[1.0, 2.0, 1.0]);
//!
//! let display = sum.display_bins(&DisplayConfig { normalize: true }).unwrap();
//! assert_eq!(display, vec![0.25, 0.5, 0.25]);
//! ```

use super::{DisplayConfig, Result, StatsError, Timeseries};

/// Default bin width: one unit of the input time scale.
pub const DEFAULT_BIN_WIDTH_MS: f64 = 1.0;

/// Default ceiling on the number of bins a single histogram may require.
pub const DEFAULT_MAX_BINS: usize = 10_000;

/// A binned latency distribution with fixed-width bins starting at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    bins: Vec<f64>,
    bin_width_ms: f64,
}

impl Histogram {
    /// Bin the finite samples of `ts`. See [`Histogram::from_samples`].
    pub fn from_timeseries(ts: &Timeseries, bin_width_ms: f64, max_bins: usize) -> Result<Self> {
        Self::from_samples(ts.samples(), bin_width_ms, max_bins)
    }

    /// Bin a sample sequence into `ceil(max / bin_width) + 1` fixed-width
    /// bins. NaN samples are skipped; bin `i` covers
    /// `[i * bin_width, (i + 1) * bin_width)`. Samples outside the bin range
    /// are not counted, matching fixed-range binning.
    ///
    /// # Errors
    ///
    /// `NoFiniteSamples` when nothing is binnable, `BinCountExceeded` when
    /// the sample range would require more than `max_bins` bins. The bin
    /// count is never silently truncated.
    pub fn from_samples(samples: &[f64], bin_width_ms: f64, max_bins: usize) -> Result<Self> {
        let usable: Vec<f64> = samples
            .iter()
            .copied()
            .filter(|s| s.is_finite() && *s >= 0.0)
            .collect();
        if usable.is_empty() {
            return Err(StatsError::NoFiniteSamples);
        }

        let max = usable.iter().copied().fold(f64::MIN, f64::max);
        // Saturating float-to-usize keeps a degenerate width from wrapping.
        let bin_count = ((max / bin_width_ms).ceil() as usize).saturating_add(1);
        if bin_count > max_bins {
            return Err(StatsError::BinCountExceeded {
                required: bin_count,
                limit: max_bins,
            });
        }

        let mut bins = vec![0.0; bin_count];
        for sample in usable {
            let idx = (sample / bin_width_ms).floor() as usize;
            if idx < bin_count {
                bins[idx] += 1.0;
            }
        }

        Ok(Self::from_raw_bins(bins, bin_width_ms))
    }

    /// Wrap an existing raw bin sequence, trimming trailing zero bins.
    pub fn from_raw_bins(mut bins: Vec<f64>, bin_width_ms: f64) -> Self {
        let keep = bins.iter().rposition(|b| *b != 0.0).map_or(0, |i| i + 1);
        bins.truncate(keep);
        Self { bins, bin_width_ms }
    }

    /// Raw per-bin counts, trailing zeros trimmed.
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    pub fn bin_width_ms(&self) -> f64 {
        self.bin_width_ms
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Bins as presented to report consumers.
    ///
    /// # Errors
    ///
    /// `DegenerateDistribution` when normalization is requested and the bins
    /// sum to zero.
    pub fn display_bins(&self, config: &DisplayConfig) -> Result<Vec<f64>> {
        if !config.normalize {
            return Ok(self.bins.clone());
        }
        let sum: f64 = self.bins.iter().sum();
        if sum == 0.0 {
            return Err(StatsError::DegenerateDistribution);
        }
        Ok(self.bins.iter().map(|b| b / sum).collect())
    }

    /// Distribution of the sum of the independent latencies described by
    /// `parts`, computed by folding discrete convolution over their raw bin
    /// sequences and trimming the result.
    ///
    /// # Errors
    ///
    /// `EmptyComposition` for an empty input, `BinWidthMismatch` when the
    /// operands disagree on bin width.
    pub fn sum(parts: &[&Histogram]) -> Result<Self> {
        let first = parts.first().ok_or(StatsError::EmptyComposition)?;
        let mut acc = first.bins.clone();
        for part in &parts[1..] {
            if (part.bin_width_ms - first.bin_width_ms).abs() > f64::EPSILON {
                return Err(StatsError::BinWidthMismatch(
                    first.bin_width_ms,
                    part.bin_width_ms,
                ));
            }
            acc = convolve(&acc, &part.bins);
        }
        Ok(Self::from_raw_bins(acc, first.bin_width_ms))
    }

    /// Lower edge of the last populated bin: the worst observed latency
    /// rounded down to the bin grid. Zero for an empty histogram.
    pub fn worst_case_ms(&self) -> f64 {
        if self.bins.is_empty() {
            return 0.0;
        }
        (self.bins.len() - 1) as f64 * self.bin_width_ms
    }
}

/// Full discrete convolution; output length is `a.len() + b.len() - 1`.
fn convolve(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x == 0.0 {
            continue;
        }
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_samples_bins_and_trims() {
        // max 6.5 -> ceil(6.5) + 1 = 8 bins, trailing zero trimmed to 7
        let h = Histogram::from_samples(&[5.0, 6.5, 5.9], 1.0, DEFAULT_MAX_BINS).unwrap();
        assert_eq!(h.bins().len(), 7);
        assert_eq!(h.bins()[5], 2.0);
        assert_eq!(h.bins()[6], 1.0);
        assert_eq!(h.worst_case_ms(), 6.0);
    }

    #[test]
    fn test_from_samples_skips_nan() {
        let h = Histogram::from_samples(&[2.0, f64::NAN, 2.0], 1.0, DEFAULT_MAX_BINS).unwrap();
        assert_eq!(h.bins(), &[0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_from_samples_all_nan_fails() {
        let err = Histogram::from_samples(&[f64::NAN], 1.0, DEFAULT_MAX_BINS).unwrap_err();
        assert_eq!(err, StatsError::NoFiniteSamples);
    }

    #[test]
    fn test_from_samples_negative_only_fails() {
        let err = Histogram::from_samples(&[-3.0], 1.0, DEFAULT_MAX_BINS).unwrap_err();
        assert_eq!(err, StatsError::NoFiniteSamples);
    }

    #[test]
    fn test_bin_count_limit_is_hard_error() {
        let err = Histogram::from_samples(&[10_500.0], 1.0, DEFAULT_MAX_BINS).unwrap_err();
        match err {
            StatsError::BinCountExceeded { required, limit } => {
                assert_eq!(required, 10_501);
                assert_eq!(limit, DEFAULT_MAX_BINS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_bin_width_is_rejected_not_panicking() {
        let err = Histogram::from_samples(&[1.0], 0.0, DEFAULT_MAX_BINS).unwrap_err();
        assert!(matches!(err, StatsError::BinCountExceeded { .. }));
    }

    #[test]
    fn test_zero_samples_make_single_bin() {
        let h = Histogram::from_samples(&[0.0, 0.0], 1.0, DEFAULT_MAX_BINS).unwrap();
        assert_eq!(h.bins(), &[2.0]);
        assert_eq!(h.worst_case_ms(), 0.0);
    }

    #[test]
    fn test_wider_bins() {
        let h = Histogram::from_samples(&[5.0, 14.0], 10.0, DEFAULT_MAX_BINS).unwrap();
        assert_eq!(h.bins(), &[1.0, 1.0]);
        assert_eq!(h.worst_case_ms(), 10.0);
    }

    #[test]
    fn test_sum_convolves_raw_bins() {
        let a = Histogram::from_raw_bins(vec![1.0, 1.0], 1.0);
        let b = Histogram::from_raw_bins(vec![1.0, 1.0], 1.0);
        let sum = Histogram::sum(&[&a, &b]).unwrap();
        assert_eq!(sum.bins(), &[1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_sum_three_parts() {
        let a = Histogram::from_raw_bins(vec![1.0, 1.0], 1.0);
        let b = Histogram::from_raw_bins(vec![1.0, 1.0], 1.0);
        let c = Histogram::from_raw_bins(vec![1.0], 1.0);
        let sum = Histogram::sum(&[&a, &b, &c]).unwrap();
        assert_eq!(sum.bins(), &[1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_sum_single_part_is_identity() {
        let a = Histogram::from_raw_bins(vec![2.0, 0.0, 1.0], 1.0);
        let sum = Histogram::sum(&[&a]).unwrap();
        assert_eq!(sum.bins(), a.bins());
    }

    #[test]
    fn test_sum_empty_input_fails() {
        assert_eq!(
            Histogram::sum(&[]).unwrap_err(),
            StatsError::EmptyComposition
        );
    }

    #[test]
    fn test_sum_rejects_mixed_bin_widths() {
        let a = Histogram::from_raw_bins(vec![1.0], 1.0);
        let b = Histogram::from_raw_bins(vec![1.0], 2.0);
        assert!(matches!(
            Histogram::sum(&[&a, &b]).unwrap_err(),
            StatsError::BinWidthMismatch(_, _)
        ));
    }

    #[test]
    fn test_display_bins_normalized() {
        let h = Histogram::from_raw_bins(vec![1.0, 2.0, 1.0], 1.0);
        let display = h.display_bins(&DisplayConfig { normalize: true }).unwrap();
        assert_eq!(display, vec![0.25, 0.5, 0.25]);
    }

    #[test]
    fn test_display_bins_raw_by_default() {
        let h = Histogram::from_raw_bins(vec![1.0, 2.0], 1.0);
        let display = h.display_bins(&DisplayConfig::default()).unwrap();
        assert_eq!(display, vec![1.0, 2.0]);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let h = Histogram::from_raw_bins(vec![1.0, 3.0], 1.0);
        let config = DisplayConfig { normalize: true };
        let once = h.display_bins(&config).unwrap();
        let again = Histogram::from_raw_bins(once.clone(), 1.0)
            .display_bins(&config)
            .unwrap();
        for (a, b) in once.iter().zip(&again) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_normalize_empty_is_degenerate() {
        let h = Histogram::from_raw_bins(Vec::new(), 1.0);
        assert_eq!(
            h.display_bins(&DisplayConfig { normalize: true })
                .unwrap_err(),
            StatsError::DegenerateDistribution
        );
    }

    #[test]
    fn test_trailing_zero_bins_are_trimmed() {
        let h = Histogram::from_raw_bins(vec![0.0, 1.0, 0.0, 0.0], 1.0);
        assert_eq!(h.bins(), &[0.0, 1.0]);
    }

    #[test]
    fn test_convolve_lengths() {
        assert_eq!(convolve(&[1.0, 1.0], &[1.0, 1.0, 1.0]).len(), 4);
        assert_eq!(convolve(&[1.0], &[1.0]), vec![1.0]);
        assert!(convolve(&[], &[1.0]).is_empty());
    }
}
