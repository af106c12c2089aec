//! JSON latency reports.
//!
//! One report per run: for every selected path its display histogram, raw
//! samples where the path carries them, summary statistics and loss
//! counters, plus the same breakdown per segment. Unmatched samples
//! serialize as `null`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::model::{Application, EndToEndId, NodePathId, NodeSegment, PathRef, PathSegment};
use crate::stats::{summarize, DisplayConfig, Histogram, LatencySummary, Timeseries};

/// Root report structure.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    pub bin_width_ms: f64,
    pub normalized: bool,
    pub paths: Vec<PathReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    EndToEnd,
    NodePath,
}

#[derive(Debug, Serialize)]
pub struct PathReport {
    pub name: String,
    pub kind: PathKind,
    /// Display bins, normalized when the run asked for it.
    pub histogram: Vec<f64>,
    pub worst_case_ms: f64,
    /// Raw samples, only where the path carries them directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<LatencySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counters: Option<SampleCounters>,
    pub segments: Vec<SegmentReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Callback,
    Sched,
    Comm,
    NodePath,
    Transport,
}

#[derive(Debug, Serialize)]
pub struct SegmentReport {
    pub name: String,
    pub kind: SegmentKind,
    pub histogram: Vec<f64>,
    pub worst_case_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<LatencySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counters: Option<SampleCounters>,
    /// Wire-level hop inside a communication segment, when the transport
    /// recorded its own timestamps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<Box<SegmentReport>>,
}

/// Invocation accounting for loss-rate statistics.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SampleCounters {
    pub total: usize,
    pub unmatched: usize,
    pub loss_rate: f64,
}

impl SampleCounters {
    fn of(ts: &Timeseries) -> Self {
        Self {
            total: ts.total_recorded(),
            unmatched: ts.unmatched_count(),
            loss_rate: ts.loss_rate(),
        }
    }
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize report")
    }
}

/// Build the report for the given paths.
pub fn build_report(
    app: &Application,
    bin_width_ms: f64,
    display: &DisplayConfig,
    paths: &[PathRef],
) -> Result<AnalysisReport> {
    let mut reports = Vec::with_capacity(paths.len());
    for &path in paths {
        reports.push(build_path_report(app, path, display)?);
    }
    Ok(AnalysisReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        format: "cadena-report-v1".to_string(),
        bin_width_ms,
        normalized: display.normalize,
        paths: reports,
    })
}

pub fn build_path_report(
    app: &Application,
    path: PathRef,
    display: &DisplayConfig,
) -> Result<PathReport> {
    let name = app.path_name(path).to_string();
    let hist = app
        .path_histogram(path)
        .with_context(|| format!("path '{name}' has no attached distribution"))?;
    let histogram = hist
        .display_bins(display)
        .with_context(|| format!("rendering distribution of path '{name}'"))?;

    let ts = app.path_timeseries(path);
    let summary = match ts {
        Some(ts) => {
            Some(summarize(ts).with_context(|| format!("summarizing samples of path '{name}'"))?)
        }
        None => None,
    };

    let (kind, segments) = match path {
        PathRef::EndToEnd(id) => (PathKind::EndToEnd, end_to_end_segments(app, id, display)?),
        PathRef::NodePath(id) => (PathKind::NodePath, node_path_segments(app, id, display)?),
    };

    Ok(PathReport {
        name,
        kind,
        histogram,
        worst_case_ms: hist.worst_case_ms(),
        samples: ts.map(|ts| ts.samples().to_vec()),
        summary,
        counters: ts.map(SampleCounters::of),
        segments,
    })
}

fn node_path_segments(
    app: &Application,
    id: NodePathId,
    display: &DisplayConfig,
) -> Result<Vec<SegmentReport>> {
    let path = app.node_path(id);
    let mut segments = Vec::with_capacity(path.segments().len());
    for segment in path.segments() {
        let report = match segment {
            NodeSegment::Callback(id) => {
                let cb = app.callback(*id);
                edge_report(
                    cb.symbol(),
                    SegmentKind::Callback,
                    cb.histogram(),
                    cb.timeseries(),
                    display,
                )?
            }
            NodeSegment::Sched(id) => {
                let sched = app.sched(*id);
                edge_report(
                    sched.name(),
                    SegmentKind::Sched,
                    sched.histogram(),
                    sched.timeseries(),
                    display,
                )?
            }
        };
        segments.push(report);
    }
    Ok(segments)
}

fn end_to_end_segments(
    app: &Application,
    id: EndToEndId,
    display: &DisplayConfig,
) -> Result<Vec<SegmentReport>> {
    let path = app.end_to_end(id);
    let mut segments = Vec::with_capacity(path.segments().len());
    for segment in path.segments() {
        let report = match segment {
            PathSegment::NodePath(id) => {
                let np = app.node_path(*id);
                edge_report(
                    np.name(),
                    SegmentKind::NodePath,
                    np.histogram(),
                    np.timeseries(),
                    display,
                )?
            }
            PathSegment::Comm(id) => {
                let comm = app.comm(*id);
                let mut report = edge_report(
                    comm.name(),
                    SegmentKind::Comm,
                    comm.histogram(),
                    comm.timeseries(),
                    display,
                )?;
                if comm.transport().histogram().is_some() {
                    let wire = edge_report(
                        &format!("{} (wire)", comm.name()),
                        SegmentKind::Transport,
                        comm.transport().histogram(),
                        comm.transport().timeseries(),
                        display,
                    )?;
                    report.transport = Some(Box::new(wire));
                }
                report
            }
        };
        segments.push(report);
    }
    Ok(segments)
}

fn edge_report(
    name: &str,
    kind: SegmentKind,
    hist: Option<&Histogram>,
    ts: Option<&Timeseries>,
    display: &DisplayConfig,
) -> Result<SegmentReport> {
    let hist = hist.with_context(|| format!("segment '{name}' has no attached distribution"))?;
    let histogram = hist
        .display_bins(display)
        .with_context(|| format!("rendering distribution of segment '{name}'"))?;
    let summary = match ts {
        Some(ts) if !ts.finite_samples().is_empty() => {
            Some(summarize(ts).with_context(|| format!("summarizing segment '{name}'"))?)
        }
        _ => None,
    };
    Ok(SegmentReport {
        name: name.to_string(),
        kind,
        histogram,
        worst_case_ms: hist.worst_case_ms(),
        summary,
        counters: ts.map(SampleCounters::of),
        transport: None,
    })
}

pub fn write_report(report: &AnalysisReport, path: &Path) -> Result<()> {
    let json = report.to_json()?;
    fs::write(path, json)
        .with_context(|| format!("failed to write report file {}", path.display()))?;
    info!(path = %path.display(), paths = report.paths.len(), "report written");
    Ok(())
}

/// Write one single-path report per selected path into `dir`, each named by
/// [`file_slug`] of its path name.
pub fn write_split_reports(
    app: &Application,
    bin_width_ms: f64,
    display: &DisplayConfig,
    paths: &[PathRef],
    dir: &Path,
) -> Result<()> {
    for &path in paths {
        let name = app.path_name(path).to_string();
        let report = build_report(app, bin_width_ms, display, &[path])?;
        let file = dir.join(format!("{}.json", file_slug(&name)));
        write_report(&report, &file)?;
    }
    Ok(())
}

/// File-name slug for a path or topic name: the leading slash goes, every
/// other unsafe run becomes a single underscore.
pub fn file_slug(name: &str) -> String {
    let trimmed = name.trim_start_matches('/');
    match Regex::new(r"[^A-Za-z0-9.>_-]+") {
        Ok(re) => re.replace_all(trimmed, "_").into_owned(),
        Err(_) => trimmed.replace('/', "_"),
    }
}
