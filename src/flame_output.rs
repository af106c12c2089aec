//! Folded-stack latency export.
//!
//! One folded line per path segment carrying its worst observed latency,
//! the input format flamegraph tooling consumes. Segments of a node path
//! fold under that node path's name; communication hops stand alone.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::model::{Application, NodePathId, NodeSegment, PathRef, PathSegment};

/// Render the folded stacks for one derived path.
///
/// # Errors
///
/// Fails when any segment on the path has no attached distribution, i.e.
/// the path was never run through statistics attachment.
pub fn collapse(app: &Application, path: PathRef) -> Result<String> {
    let mut folded = String::new();
    match path {
        PathRef::EndToEnd(id) => {
            for segment in app.end_to_end(id).segments() {
                match segment {
                    PathSegment::NodePath(np) => collapse_node_path(app, *np, &mut folded)?,
                    PathSegment::Comm(id) => {
                        let comm = app.comm(*id);
                        let hist = comm.histogram().with_context(|| {
                            format!("communication '{}' has no attached distribution", comm.name())
                        })?;
                        folded.push_str(&format!("{} {}\n", comm.name(), hist.worst_case_ms()));
                    }
                }
            }
        }
        PathRef::NodePath(id) => collapse_node_path(app, id, &mut folded)?,
    }
    Ok(folded)
}

fn collapse_node_path(app: &Application, id: NodePathId, folded: &mut String) -> Result<()> {
    let path = app.node_path(id);
    for segment in path.segments() {
        let (name, hist) = match segment {
            NodeSegment::Callback(id) => {
                let cb = app.callback(*id);
                (cb.symbol(), cb.histogram())
            }
            NodeSegment::Sched(id) => {
                let sched = app.sched(*id);
                (sched.name(), sched.histogram())
            }
        };
        let hist = hist
            .with_context(|| format!("segment '{name}' has no attached distribution"))?;
        folded.push_str(&format!(
            "{};{} {}\n",
            path.name(),
            name,
            hist.worst_case_ms()
        ));
    }
    Ok(())
}

/// Write the folded stacks for `path_ref` to `out`.
pub fn write_flame(app: &Application, path_ref: PathRef, out: &Path) -> Result<()> {
    let folded = collapse(app, path_ref)?;
    fs::write(out, &folded)
        .with_context(|| format!("failed to write flame file {}", out.display()))?;
    info!(path = %out.display(), lines = folded.lines().count(), "folded stacks written");
    Ok(())
}
