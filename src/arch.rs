//! Declared-architecture documents.
//!
//! The architecture is a JSON node list: per node its callbacks (timer or
//! subscription), the declared scheduling chains between callback symbols,
//! and the topics each callback publishes. `Application::describe` emits the
//! same shape back, so a constructed graph round-trips through this file.

use std::fs;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureDoc {
    pub nodes: Vec<NodeDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDoc {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub start_node: bool,
    #[serde(default)]
    pub end_node: bool,
    #[serde(default)]
    pub callbacks: Vec<CallbackDoc>,
    /// Topics the node publishes without a declared publishing callback.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unlinked_publish_topic_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CallbackDoc {
    #[serde(rename = "timer_callback")]
    Timer {
        period: f64,
        symbol: String,
        #[serde(default)]
        subsequent_callback_symbols: Vec<String>,
        #[serde(default)]
        publish_topic_names: Vec<String>,
    },
    #[serde(rename = "subscribe_callback")]
    Subscribe {
        topic_name: String,
        symbol: String,
        #[serde(default)]
        subsequent_callback_symbols: Vec<String>,
        #[serde(default)]
        publish_topic_names: Vec<String>,
    },
}

impl CallbackDoc {
    pub fn symbol(&self) -> &str {
        match self {
            CallbackDoc::Timer { symbol, .. } | CallbackDoc::Subscribe { symbol, .. } => symbol,
        }
    }

    pub fn subsequent_callback_symbols(&self) -> &[String] {
        match self {
            CallbackDoc::Timer {
                subsequent_callback_symbols,
                ..
            }
            | CallbackDoc::Subscribe {
                subsequent_callback_symbols,
                ..
            } => subsequent_callback_symbols,
        }
    }

    pub fn publish_topic_names(&self) -> &[String] {
        match self {
            CallbackDoc::Timer {
                publish_topic_names,
                ..
            }
            | CallbackDoc::Subscribe {
                publish_topic_names,
                ..
            } => publish_topic_names,
        }
    }
}

impl ArchitectureDoc {
    pub fn load(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)
            .with_context(|| format!("failed to open architecture file {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse architecture file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize architecture")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write architecture file {}", path.display()))
    }
}
