// Declared nodes.

use super::callback::Publish;
use super::{CallbackId, NodeId, NodePathId, SchedId};

/// One declared node: an ordered, append-only callback list, its scheduling
/// edges, publishes not attributed to any callback, and the derived
/// intra-node paths. Identity is (namespace, name). Mutated only during
/// construction.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    namespace: String,
    is_start: bool,
    is_end: bool,
    callbacks: Vec<CallbackId>,
    scheds: Vec<SchedId>,
    unlinked_publishes: Vec<Publish>,
    paths: Vec<NodePathId>,
}

impl Node {
    pub fn new(id: NodeId, name: String, namespace: String, is_start: bool, is_end: bool) -> Self {
        Self {
            id,
            name,
            namespace,
            is_start,
            is_end,
            callbacks: Vec::new(),
            scheds: Vec::new(),
            unlinked_publishes: Vec::new(),
            paths: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Namespace-qualified identity, unique across the application.
    pub fn qualified_name(&self) -> String {
        if self.namespace.ends_with('/') {
            format!("{}{}", self.namespace, self.name)
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }

    pub fn is_start(&self) -> bool {
        self.is_start
    }

    pub fn is_end(&self) -> bool {
        self.is_end
    }

    pub fn add_callback(&mut self, id: CallbackId) {
        self.callbacks.push(id);
    }

    pub fn callbacks(&self) -> &[CallbackId] {
        &self.callbacks
    }

    pub fn add_sched(&mut self, id: SchedId) {
        self.scheds.push(id);
    }

    pub fn scheds(&self) -> &[SchedId] {
        &self.scheds
    }

    pub fn add_unlinked_publish(&mut self, topic: String) {
        self.unlinked_publishes.push(Publish::new(topic));
    }

    /// Publishes declared on the node without a publishing callback. They
    /// never join end-to-end paths but survive for export and rendering.
    pub fn unlinked_publishes(&self) -> &[Publish] {
        &self.unlinked_publishes
    }

    pub fn unlinked_publishes_mut(&mut self) -> &mut [Publish] {
        &mut self.unlinked_publishes
    }

    pub fn add_path(&mut self, id: NodePathId) {
        self.paths.push(id);
    }

    pub fn paths(&self) -> &[NodePathId] {
        &self.paths
    }
}
