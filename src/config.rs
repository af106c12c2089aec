//! Analysis configuration.
//!
//! One value carrying every analysis knob from the CLI flags into graph
//! construction, transient trimming and histogram attachment. The serde
//! derives let embedders load the same struct from a JSON document with
//! the same defaults.

use serde::{Deserialize, Serialize};

use crate::stats::{DEFAULT_BIN_WIDTH_MS, DEFAULT_MAX_BINS};
use crate::transient::TransientWindow;

/// Topics excluded from graph construction by default: the runtime's own
/// logging and parameter channels, which every node touches and which never
/// belong to an analyzed pipeline.
pub const DEFAULT_IGNORED_TOPICS: &[&str] = &["/rosout", "/parameter_events"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Histogram bin width in milliseconds.
    ///
    /// Default: 1.0
    #[serde(default = "default_bin_width")]
    pub bin_width_ms: f64,

    /// Upper bound on histogram bins. Construction fails beyond it instead
    /// of silently truncating the distribution.
    ///
    /// Default: 10000
    #[serde(default = "default_max_bins")]
    pub max_bins: usize,

    /// Warm-up/cool-down trimming window.
    #[serde(default)]
    pub transient: TransientWindow,

    /// Topics dropped from the graph before construction.
    #[serde(default = "default_ignored_topics")]
    pub ignore_topics: Vec<String>,
}

fn default_bin_width() -> f64 {
    DEFAULT_BIN_WIDTH_MS
}

fn default_max_bins() -> usize {
    DEFAULT_MAX_BINS
}

fn default_ignored_topics() -> Vec<String> {
    DEFAULT_IGNORED_TOPICS.iter().map(|t| t.to_string()).collect()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bin_width_ms: DEFAULT_BIN_WIDTH_MS, // one bin per millisecond
            max_bins: DEFAULT_MAX_BINS,
            transient: TransientWindow::default(),
            ignore_topics: default_ignored_topics(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.bin_width_ms.is_finite() || self.bin_width_ms <= 0.0 {
            return Err(format!(
                "bin_width_ms must be positive, got {}",
                self.bin_width_ms
            ));
        }
        if self.max_bins == 0 {
            return Err("max_bins must be at least 1".to_string());
        }
        if self.transient.warmup_ms < 0.0 {
            return Err(format!(
                "warmup_ms must be non-negative, got {}",
                self.transient.warmup_ms
            ));
        }
        if self.transient.cooldown_ms < 0.0 {
            return Err(format!(
                "cooldown_ms must be non-negative, got {}",
                self.transient.cooldown_ms
            ));
        }
        Ok(())
    }
}
