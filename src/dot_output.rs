//! Graphviz topology export.
//!
//! Text-only DOT writer over the assembled graph: one cluster per node with
//! start and end nodes filled distinctly, blue edges for topic communication
//! and intra-node scheduling, red dashed edges for publishes that no callback
//! owns. Turning the text into an image stays with external tooling.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::model::{Application, CallbackId, Node};

/// Render the application topology as a DOT document.
pub fn render(app: &Application) -> String {
    let mut dot = String::new();
    dot.push_str("digraph application {\n");
    dot.push_str("    rankdir=LR;\n");
    dot.push_str("    compound=true;\n");
    dot.push_str("    node [shape=rect];\n");

    for node in app.nodes() {
        dot.push('\n');
        dot.push_str(&render_cluster(app, node));
    }
    dot.push('\n');

    for comm in app.comms() {
        dot.push_str(&format!(
            "    {} -> {} [color=blue];\n",
            dot_id(comm.producer_callback()),
            dot_id(comm.consumer_callback())
        ));
    }

    for sched in app.scheds() {
        dot.push_str(&format!(
            "    {} -> {} [color=blue, constraint=false];\n",
            dot_id(sched.producer()),
            dot_id(sched.consumer())
        ));
    }

    dot.push_str(&render_unlinked_edges(app));
    dot.push_str("}\n");
    dot
}

/// One subgraph cluster per node, its callbacks as the member vertices.
fn render_cluster(app: &Application, node: &Node) -> String {
    let mut cluster = format!("    subgraph {} {{\n", cluster_id(node));
    if node.is_start() {
        cluster.push_str(&format!(
            "        label=\"{} (start)\";\n",
            escape(node.name())
        ));
        cluster.push_str("        style=\"rounded,filled,solid\";\n");
        cluster.push_str("        color=black;\n");
        cluster.push_str("        fillcolor=lightblue1;\n");
    } else if node.is_end() {
        cluster.push_str(&format!(
            "        label=\"{} (end)\";\n",
            escape(node.name())
        ));
        cluster.push_str("        style=\"rounded,filled,solid\";\n");
        cluster.push_str("        color=black;\n");
        cluster.push_str("        fillcolor=bisque;\n");
    } else {
        cluster.push_str(&format!("        label=\"{}\";\n", escape(node.name())));
        cluster.push_str("        style=rounded;\n");
    }

    for &cb in node.callbacks() {
        cluster.push_str(&format!(
            "        {} [label=\"{}\"];\n",
            dot_id(cb),
            escape(app.callback(cb).symbol())
        ));
    }
    cluster.push_str("    }\n");
    cluster
}

/// Edges for node-level publishes without a publishing callback. Drawn from
/// the cluster boundary (via `ltail`) to every subscription on the topic, so
/// the unattributed hop stays visible without joining any path.
fn render_unlinked_edges(app: &Application) -> String {
    let mut dot = String::new();
    for node in app.nodes() {
        // ltail needs a member vertex to anchor the edge
        let Some(&anchor) = node.callbacks().first() else {
            if !node.unlinked_publishes().is_empty() {
                debug!(
                    node = node.name(),
                    "unlinked publishes on a node without callbacks, not drawn"
                );
            }
            continue;
        };
        for publish in node.unlinked_publishes() {
            for consumer in app.callbacks() {
                if consumer.kind().subscribed_topic() != Some(publish.topic()) {
                    continue;
                }
                dot.push_str(&format!(
                    "    {} -> {} [color=red, style=dashed, ltail={}, label=\"{}\"];\n",
                    dot_id(anchor),
                    dot_id(consumer.id()),
                    cluster_id(node),
                    escape(publish.topic())
                ));
            }
        }
    }
    dot
}

fn cluster_id(node: &Node) -> String {
    format!("cluster_{}", node.id().index())
}

fn dot_id(cb: CallbackId) -> String {
    format!("cb{}", cb.index())
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Write the rendered topology to `path`.
pub fn write_graph(app: &Application, path: &Path) -> Result<()> {
    let dot = render(app);
    fs::write(path, dot)
        .with_context(|| format!("failed to write graph file {}", path.display()))?;
    info!(path = %path.display(), nodes = app.nodes().len(), "topology written");
    Ok(())
}
