//! CLI argument parsing for cadena

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AnalysisConfig;
use crate::stats::{DEFAULT_BIN_WIDTH_MS, DEFAULT_MAX_BINS};
use crate::transient::TransientWindow;

#[derive(Parser, Debug)]
#[command(name = "cadena")]
#[command(version)]
#[command(about = "End-to-end latency analysis for publish/subscribe callback traces", long_about = None)]
pub struct Cli {
    /// Enable diagnostic output on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every path derived from an architecture description
    Paths {
        /// Architecture description (JSON)
        arch: PathBuf,

        #[command(flatten)]
        opts: AnalysisOpts,
    },

    /// Correlate a trace against an architecture and report latency
    /// distributions per path
    Analyze {
        /// Architecture description (JSON)
        arch: PathBuf,

        /// Trace capture (JSON)
        trace: PathBuf,

        /// Report file, or an existing directory for one report per path;
        /// stdout when omitted
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Restrict the report to one path by name
        #[arg(long, value_name = "NAME")]
        path: Option<String>,

        /// Emit normalized (sum = 1) histogram bins
        #[arg(long)]
        normalize: bool,

        #[command(flatten)]
        opts: AnalysisOpts,
    },

    /// Render the application topology as Graphviz DOT text
    Graph {
        /// Architecture description (JSON)
        arch: PathBuf,

        /// DOT file; stdout when omitted
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Also re-export the constructed graph as an architecture document
        #[arg(long, value_name = "FILE")]
        export_arch: Option<PathBuf>,

        #[command(flatten)]
        opts: AnalysisOpts,
    },

    /// Write folded stacks for one path, for flamegraph tooling
    Flame {
        /// Architecture description (JSON)
        arch: PathBuf,

        /// Trace capture (JSON)
        trace: PathBuf,

        /// Path name to collapse
        #[arg(long, value_name = "NAME")]
        path: String,

        /// Folded-stack file; stdout when omitted
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,

        #[command(flatten)]
        opts: AnalysisOpts,
    },
}

/// Analysis knobs shared by the subcommands.
#[derive(Args, Debug, Clone)]
pub struct AnalysisOpts {
    /// Histogram bin width in milliseconds
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_BIN_WIDTH_MS)]
    pub bin_width_ms: f64,

    /// Upper bound on bins a single histogram may require
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_BINS)]
    pub max_bins: usize,

    /// Drop samples captured within this long after the first trace event
    #[arg(long, value_name = "MS", default_value_t = 0.0)]
    pub warmup_ms: f64,

    /// Drop samples captured within this long before the last trace event
    #[arg(long, value_name = "MS", default_value_t = 0.0)]
    pub cooldown_ms: f64,

    /// Drop a topic before graph construction (repeatable; the runtime's
    /// housekeeping topics are dropped when no override is given)
    #[arg(long = "ignore-topic", value_name = "TOPIC")]
    pub ignore_topics: Vec<String>,
}

impl AnalysisOpts {
    /// Fold the flags into a validated config, keeping the built-in ignore
    /// list unless topics were given explicitly.
    pub fn to_config(&self) -> Result<AnalysisConfig, String> {
        let mut config = AnalysisConfig {
            bin_width_ms: self.bin_width_ms,
            max_bins: self.max_bins,
            transient: TransientWindow {
                warmup_ms: self.warmup_ms,
                cooldown_ms: self.cooldown_ms,
            },
            ..AnalysisConfig::default()
        };
        if !self.ignore_topics.is_empty() {
            config.ignore_topics = self.ignore_topics.clone();
        }
        config.validate()?;
        Ok(config)
    }
}
