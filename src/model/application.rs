//! Application assembly and path derivation.
//!
//! This module resolves a declared architecture into the complete analyzable
//! graph and derives every causal path a report can target.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────┐
//! │ ArchitectureDoc (declared)  │
//! │   nodes, callbacks,         │
//! │   subsequent symbols,       │
//! │   publish topic names       │
//! └─────────────────────────────┘
//!               │ from_architecture()
//!               ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │ Application                                             │
//! │                                                         │
//! │  callbacks ──▶ Sched edges (resolved symbols)           │
//! │       │                                                 │
//! │       │ intra-node DFS (targets: publishing callbacks)  │
//! │       ▼                                                 │
//! │  NodePath: cb ─sched─ cb ─sched─ cb                     │
//! │       │                                                 │
//! │       │ topic matching + cross-node DFS                 │
//! │       ▼                                                 │
//! │  EndToEndPath: np ──Comm── np ──Comm── np               │
//! └─────────────────────────────────────────────────────────┘
//!               │ correlation + attach_statistics()
//!               ▼
//!      per-edge Timeseries, per-path Histogram
//!      (composed bottom-up by convolution)
//! ```
//!
//! # Peer-Reviewed Foundation
//!
//! - **Sigelman et al. (2010). "Dapper, a Large-Scale Distributed Systems
//!   Tracing Infrastructure."**
//!   - Finding: end-to-end latency must be reconstructed from causal edges,
//!     not wall-clock correlation alone
//!   - Application: paths are derived from declared causality, then samples
//!     are attached per edge
//!
//! - **Casini et al. (2019). "Response-Time Analysis of ROS 2 Processing
//!   Chains Under Reservation-Based Scheduling."**
//!   - Finding: callback chains and their scheduling delays dominate
//!     end-to-end response times in publish/subscribe executors
//!   - Application: scheduling edges are first-class, with their own latency
//!     distributions

use std::collections::{HashMap, HashSet};

use anyhow::Context;
use tracing::debug;

use crate::arch::{ArchitectureDoc, CallbackDoc, NodeDoc};
use crate::path_search::{search, SearchSpace};
use crate::stats::Histogram;

use super::{
    Callback, CallbackId, CallbackKind, Comm, CommId, ConstructionError, EndToEndId, EndToEndPath,
    NameRegistry, Node, NodeId, NodePath, NodePathId, NodeSegment, PathSegment, Result, Sched,
    SchedId,
};

/// A reference to any analyzable path, end-to-end or intra-node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRef {
    EndToEnd(EndToEndId),
    NodePath(NodePathId),
}

/// The fully constructed graph: arena-owned entities plus derived paths.
///
/// Built once by [`Application::from_architecture`]; afterwards the only
/// mutation is the one-time attachment of samples and histograms.
#[derive(Debug, Default)]
pub struct Application {
    nodes: Vec<Node>,
    callbacks: Vec<Callback>,
    scheds: Vec<Sched>,
    comms: Vec<Comm>,
    node_paths: Vec<NodePath>,
    end_to_end_paths: Vec<EndToEndPath>,
}

/// Intra-node search space: callbacks linked by scheduling edges, chains
/// terminating at publishing callbacks.
struct CallbackSpace<'a> {
    callbacks: &'a [Callback],
}

impl SearchSpace for CallbackSpace<'_> {
    type Key = CallbackId;

    fn successors(&self, key: CallbackId) -> Vec<CallbackId> {
        self.callbacks[key.index()].subsequent().to_vec()
    }

    fn is_target(&self, key: CallbackId) -> bool {
        self.callbacks[key.index()].has_publish()
    }

    fn label(&self, key: CallbackId) -> String {
        self.callbacks[key.index()].symbol().to_string()
    }
}

/// Cross-node search space: node paths linked where a tail publish topic
/// matches a head subscription topic, chains terminating at end-node paths.
struct NodePathSpace {
    successors: Vec<Vec<NodePathId>>,
    is_end: Vec<bool>,
    labels: Vec<String>,
}

impl SearchSpace for NodePathSpace {
    type Key = NodePathId;

    fn successors(&self, key: NodePathId) -> Vec<NodePathId> {
        self.successors[key.index()].clone()
    }

    fn is_target(&self, key: NodePathId) -> bool {
        self.is_end[key.index()]
    }

    fn label(&self, key: NodePathId) -> String {
        self.labels[key.index()].clone()
    }
}

impl Application {
    /// Resolve a declared architecture into the full graph.
    ///
    /// Subscriptions and publishes on topics in `ignore_topics` are dropped
    /// before construction. Per-node paths are derived as soon as each
    /// node's callbacks and scheduling edges are complete, end-to-end paths
    /// once every node is in place.
    ///
    /// # Errors
    ///
    /// [`ConstructionError`] when a declared symbol does not resolve, a
    /// uniqueness invariant is violated, or the declared chains contain a
    /// cycle.
    pub fn from_architecture(doc: &ArchitectureDoc, ignore_topics: &[String]) -> Result<Self> {
        let mut app = Application::default();
        let mut registry = NameRegistry::new();

        let mut seen_nodes: HashSet<String> = HashSet::new();
        for node_doc in &doc.nodes {
            let node_id = NodeId(app.nodes.len() as u32);
            let node = app.build_node(node_id, node_doc, ignore_topics)?;
            if !seen_nodes.insert(node.qualified_name()) {
                return Err(ConstructionError::DuplicateNode {
                    node: node.qualified_name(),
                });
            }
            app.nodes.push(node);
        }

        let sched_index = app.resolve_sched_edges(doc)?;
        app.derive_node_paths(&sched_index, &mut registry)?;
        app.derive_end_to_end_paths(&mut registry)?;

        debug!(
            nodes = app.nodes.len(),
            callbacks = app.callbacks.len(),
            scheds = app.scheds.len(),
            comms = app.comms.len(),
            node_paths = app.node_paths.len(),
            end_to_end_paths = app.end_to_end_paths.len(),
            "application constructed"
        );
        Ok(app)
    }

    fn build_node(
        &mut self,
        node_id: NodeId,
        node_doc: &NodeDoc,
        ignore_topics: &[String],
    ) -> Result<Node> {
        let mut node = Node::new(
            node_id,
            node_doc.name.clone(),
            node_doc.namespace.clone(),
            node_doc.start_node,
            node_doc.end_node,
        );

        let mut timer_periods: Vec<f64> = Vec::new();
        let mut sub_topics: HashSet<String> = HashSet::new();
        for cb_doc in &node_doc.callbacks {
            let kind = match cb_doc {
                CallbackDoc::Timer { period, .. } => {
                    if timer_periods.iter().any(|p| p == period) {
                        return Err(ConstructionError::DuplicateTimerPeriod {
                            node: node_doc.name.clone(),
                            period: *period,
                        });
                    }
                    timer_periods.push(*period);
                    CallbackKind::Timer { period: *period }
                }
                CallbackDoc::Subscribe { topic_name, .. } => {
                    if ignore_topics.contains(topic_name) {
                        debug!(node = %node_doc.name, topic = %topic_name, "ignoring subscription");
                        continue;
                    }
                    if !sub_topics.insert(topic_name.clone()) {
                        return Err(ConstructionError::DuplicateSubscription {
                            node: node_doc.name.clone(),
                            topic: topic_name.clone(),
                        });
                    }
                    CallbackKind::Subscription {
                        topic: topic_name.clone(),
                    }
                }
            };

            let cb_id = CallbackId(self.callbacks.len() as u32);
            let mut cb = Callback::new(cb_id, node_id, cb_doc.symbol().to_string(), kind);
            for topic in cb_doc.publish_topic_names() {
                if ignore_topics.contains(topic) {
                    continue;
                }
                cb.add_publish(topic.clone());
            }
            node.add_callback(cb_id);
            self.callbacks.push(cb);
        }

        for topic in &node_doc.unlinked_publish_topic_names {
            if !ignore_topics.contains(topic) {
                node.add_unlinked_publish(topic.clone());
            }
        }
        Ok(node)
    }

    /// Resolve declared subsequent-callback symbols into scheduling edges.
    /// Returns a (producer, consumer) lookup used while assembling paths.
    fn resolve_sched_edges(
        &mut self,
        doc: &ArchitectureDoc,
    ) -> Result<HashMap<(CallbackId, CallbackId), SchedId>> {
        let mut sched_index = HashMap::new();

        for (node_idx, node_doc) in doc.nodes.iter().enumerate() {
            let mut by_symbol: HashMap<String, CallbackId> = HashMap::new();
            for &cb_id in self.nodes[node_idx].callbacks() {
                let cb = &self.callbacks[cb_id.index()];
                by_symbol.entry(cb.symbol().to_string()).or_insert(cb_id);
            }

            for cb_doc in &node_doc.callbacks {
                let Some(&producer) = by_symbol.get(cb_doc.symbol()) else {
                    // The callback itself was dropped by the ignore list;
                    // links from it dangle and are dropped with it.
                    continue;
                };
                for symbol in cb_doc.subsequent_callback_symbols() {
                    let consumer = *by_symbol.get(symbol.as_str()).ok_or_else(|| {
                        ConstructionError::UnknownSymbol {
                            node: node_doc.name.clone(),
                            symbol: symbol.clone(),
                        }
                    })?;
                    // One scheduling edge per ordered pair, however often the
                    // document repeats the link.
                    if sched_index.contains_key(&(producer, consumer)) {
                        continue;
                    }
                    let sched_id = SchedId(self.scheds.len() as u32);
                    let producer_symbol = self.callbacks[producer.index()].symbol().to_string();
                    let consumer_symbol = self.callbacks[consumer.index()].symbol().to_string();
                    self.scheds.push(Sched::new(
                        sched_id,
                        NodeId(node_idx as u32),
                        producer,
                        consumer,
                        &producer_symbol,
                        &consumer_symbol,
                    ));
                    self.callbacks[producer.index()].add_subsequent(consumer);
                    self.nodes[node_idx].add_sched(sched_id);
                    sched_index.insert((producer, consumer), sched_id);
                }
            }
        }
        Ok(sched_index)
    }

    /// Derive the intra-node paths of every node.
    ///
    /// End nodes contribute one single-callback path per subscription; all
    /// other nodes are searched from every callback toward publishing
    /// callbacks.
    fn derive_node_paths(
        &mut self,
        sched_index: &HashMap<(CallbackId, CallbackId), SchedId>,
        registry: &mut NameRegistry,
    ) -> Result<()> {
        for node_idx in 0..self.nodes.len() {
            let node = &self.nodes[node_idx];
            let routes: Vec<Vec<CallbackId>> = if node.is_end() {
                node.callbacks()
                    .iter()
                    .copied()
                    .filter(|&id| self.callbacks[id.index()].kind().is_subscription())
                    .map(|id| vec![id])
                    .collect()
            } else {
                let space = CallbackSpace {
                    callbacks: &self.callbacks,
                };
                let mut routes = Vec::new();
                for &cb_id in node.callbacks() {
                    routes.extend(search(&space, cb_id)?);
                }
                routes
            };

            for route in routes {
                let head = route[0];
                let tail = route.last().copied().unwrap_or(head);
                let mut segments = vec![NodeSegment::Callback(head)];
                for pair in route.windows(2) {
                    let sched_id = sched_index[&(pair[0], pair[1])];
                    segments.push(NodeSegment::Sched(sched_id));
                    segments.push(NodeSegment::Callback(pair[1]));
                }
                let path_id = NodePathId(self.node_paths.len() as u32);
                let name = registry.assign(self.nodes[node_idx].name());
                self.node_paths.push(NodePath::new(
                    path_id,
                    NodeId(node_idx as u32),
                    name,
                    segments,
                    head,
                    tail,
                ));
                self.nodes[node_idx].add_path(path_id);
            }
        }
        Ok(())
    }

    /// Link node paths across nodes by topic and enumerate every route from
    /// a start-node path to an end-node path, materializing one `Comm` per
    /// (topic, consumer callback) pair along the way.
    fn derive_end_to_end_paths(&mut self, registry: &mut NameRegistry) -> Result<()> {
        let mut successors: Vec<Vec<NodePathId>> = vec![Vec::new(); self.node_paths.len()];
        for path in &self.node_paths {
            let tail = &self.callbacks[path.tail_callback().index()];
            for other in &self.node_paths {
                let head = &self.callbacks[other.head_callback().index()];
                let Some(topic) = head.kind().subscribed_topic() else {
                    continue;
                };
                if tail.publish_on(topic).is_some() {
                    successors[path.id().index()].push(other.id());
                }
            }
        }

        let space = NodePathSpace {
            successors,
            is_end: self
                .node_paths
                .iter()
                .map(|p| self.nodes[p.node().index()].is_end())
                .collect(),
            labels: self
                .node_paths
                .iter()
                .map(|p| p.name().to_string())
                .collect(),
        };

        let roots: Vec<NodePathId> = self
            .node_paths
            .iter()
            .filter(|p| self.nodes[p.node().index()].is_start())
            .map(|p| p.id())
            .collect();

        let mut comm_index: HashMap<(String, CallbackId), CommId> = HashMap::new();
        for root in roots {
            for route in search(&space, root)? {
                let mut segments = vec![PathSegment::NodePath(route[0])];
                let mut names = vec![self.node_paths[route[0].index()].name().to_string()];

                for pair in route.windows(2) {
                    let comm_id =
                        self.comm_between(pair[0], pair[1], &mut comm_index, registry);
                    segments.push(PathSegment::Comm(comm_id));
                    segments.push(PathSegment::NodePath(pair[1]));
                    names.push(self.node_paths[pair[1].index()].name().to_string());
                }

                let id = EndToEndId(self.end_to_end_paths.len() as u32);
                let name = registry.assign(&names.join("--"));
                self.end_to_end_paths
                    .push(EndToEndPath::new(id, name, segments));
            }
        }
        Ok(())
    }

    fn comm_between(
        &mut self,
        producer_path: NodePathId,
        consumer_path: NodePathId,
        comm_index: &mut HashMap<(String, CallbackId), CommId>,
        registry: &mut NameRegistry,
    ) -> CommId {
        let consumer_cb = self.node_paths[consumer_path.index()].head_callback();
        let topic = self.callbacks[consumer_cb.index()]
            .kind()
            .subscribed_topic()
            .unwrap_or_default()
            .to_string();

        if let Some(&id) = comm_index.get(&(topic.clone(), consumer_cb)) {
            return id;
        }

        let id = CommId(self.comms.len() as u32);
        let producer_cb = self.node_paths[producer_path.index()].tail_callback();
        let name = registry.assign(&topic);
        debug!(comm = %name, topic = %topic, "materializing communication edge");
        self.comms.push(Comm::new(
            id,
            name,
            topic.clone(),
            self.node_paths[producer_path.index()].node(),
            producer_cb,
            self.node_paths[consumer_path.index()].node(),
            consumer_cb,
        ));
        comm_index.insert((topic, consumer_cb), id);
        id
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn callbacks(&self) -> &[Callback] {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut [Callback] {
        &mut self.callbacks
    }

    pub fn callback(&self, id: CallbackId) -> &Callback {
        &self.callbacks[id.index()]
    }

    pub fn callback_mut(&mut self, id: CallbackId) -> &mut Callback {
        &mut self.callbacks[id.index()]
    }

    pub fn scheds(&self) -> &[Sched] {
        &self.scheds
    }

    pub fn scheds_mut(&mut self) -> &mut [Sched] {
        &mut self.scheds
    }

    pub fn sched(&self, id: SchedId) -> &Sched {
        &self.scheds[id.index()]
    }

    pub fn sched_mut(&mut self, id: SchedId) -> &mut Sched {
        &mut self.scheds[id.index()]
    }

    pub fn comms(&self) -> &[Comm] {
        &self.comms
    }

    pub fn comms_mut(&mut self) -> &mut [Comm] {
        &mut self.comms
    }

    pub fn comm(&self, id: CommId) -> &Comm {
        &self.comms[id.index()]
    }

    pub fn comm_mut(&mut self, id: CommId) -> &mut Comm {
        &mut self.comms[id.index()]
    }

    pub fn node_paths(&self) -> &[NodePath] {
        &self.node_paths
    }

    pub fn node_path(&self, id: NodePathId) -> &NodePath {
        &self.node_paths[id.index()]
    }

    pub fn end_to_end_paths(&self) -> &[EndToEndPath] {
        &self.end_to_end_paths
    }

    pub fn end_to_end(&self, id: EndToEndId) -> &EndToEndPath {
        &self.end_to_end_paths[id.index()]
    }

    /// Every analyzable path: end-to-end chains first, then per-node paths.
    pub fn all_paths(&self) -> Vec<PathRef> {
        let mut refs: Vec<PathRef> = self
            .end_to_end_paths
            .iter()
            .map(|p| PathRef::EndToEnd(p.id()))
            .collect();
        refs.extend(self.node_paths.iter().map(|p| PathRef::NodePath(p.id())));
        refs
    }

    /// Exact-name lookup over every analyzable path.
    pub fn find_path(&self, name: &str) -> Option<PathRef> {
        self.all_paths()
            .into_iter()
            .find(|&p| self.path_name(p) == name)
    }

    pub fn path_names(&self) -> Vec<String> {
        self.all_paths()
            .into_iter()
            .map(|p| self.path_name(p).to_string())
            .collect()
    }

    pub fn path_name(&self, path: PathRef) -> &str {
        match path {
            PathRef::EndToEnd(id) => self.end_to_end_paths[id.index()].name(),
            PathRef::NodePath(id) => self.node_paths[id.index()].name(),
        }
    }

    pub fn path_histogram(&self, path: PathRef) -> Option<&Histogram> {
        match path {
            PathRef::EndToEnd(id) => self.end_to_end_paths[id.index()].histogram(),
            PathRef::NodePath(id) => self.node_paths[id.index()].histogram(),
        }
    }

    pub fn path_timeseries(&self, path: PathRef) -> Option<&crate::stats::Timeseries> {
        match path {
            PathRef::EndToEnd(_) => None,
            PathRef::NodePath(id) => self.node_paths[id.index()].timeseries(),
        }
    }

    /// Re-export the constructed graph in the architecture document shape.
    pub fn describe(&self) -> ArchitectureDoc {
        ArchitectureDoc {
            nodes: self
                .nodes
                .iter()
                .map(|node| NodeDoc {
                    name: node.name().to_string(),
                    namespace: node.namespace().to_string(),
                    start_node: node.is_start(),
                    end_node: node.is_end(),
                    callbacks: node
                        .callbacks()
                        .iter()
                        .map(|&id| self.describe_callback(id))
                        .collect(),
                    unlinked_publish_topic_names: node
                        .unlinked_publishes()
                        .iter()
                        .map(|p| p.topic().to_string())
                        .collect(),
                })
                .collect(),
        }
    }

    fn describe_callback(&self, id: CallbackId) -> CallbackDoc {
        let cb = &self.callbacks[id.index()];
        let subsequent_callback_symbols = cb
            .subsequent()
            .iter()
            .map(|&c| self.callbacks[c.index()].symbol().to_string())
            .collect();
        let publish_topic_names = cb
            .publishes()
            .iter()
            .map(|p| p.topic().to_string())
            .collect();
        match cb.kind() {
            CallbackKind::Timer { period } => CallbackDoc::Timer {
                period: *period,
                symbol: cb.symbol().to_string(),
                subsequent_callback_symbols,
                publish_topic_names,
            },
            CallbackKind::Subscription { topic } => CallbackDoc::Subscribe {
                topic_name: topic.clone(),
                symbol: cb.symbol().to_string(),
                subsequent_callback_symbols,
                publish_topic_names,
            },
        }
    }

    /// Build and attach every histogram, bottom-up: edges first, then
    /// intra-node compositions, then end-to-end compositions. Nothing is
    /// attached partially; the first failure aborts with context naming the
    /// edge or path.
    pub fn attach_statistics(&mut self, bin_width_ms: f64, max_bins: usize) -> anyhow::Result<()> {
        for cb in &mut self.callbacks {
            let ts = cb.timeseries().ok_or_else(|| {
                anyhow::anyhow!("callback '{}' has no correlated samples", cb.symbol())
            })?;
            let hist = Histogram::from_timeseries(ts, bin_width_ms, max_bins)
                .with_context(|| format!("building histogram for callback '{}'", cb.symbol()))?;
            cb.set_histogram(hist);
        }

        for sched in &mut self.scheds {
            let ts = sched.timeseries().ok_or_else(|| {
                anyhow::anyhow!("scheduling edge '{}' has no correlated samples", sched.name())
            })?;
            let hist = Histogram::from_timeseries(ts, bin_width_ms, max_bins).with_context(
                || format!("building histogram for scheduling edge '{}'", sched.name()),
            )?;
            sched.set_histogram(hist);
        }

        for comm in &mut self.comms {
            let ts = comm.timeseries().ok_or_else(|| {
                anyhow::anyhow!("communication edge '{}' has no correlated samples", comm.name())
            })?;
            let hist = Histogram::from_timeseries(ts, bin_width_ms, max_bins).with_context(
                || format!("building histogram for communication edge '{}'", comm.name()),
            )?;
            comm.set_histogram(hist);

            let wire_hist = match comm.transport().timeseries() {
                Some(wire) => Some(
                    Histogram::from_timeseries(wire, bin_width_ms, max_bins).with_context(
                        || format!("building transport histogram for edge '{}'", comm.name()),
                    )?,
                ),
                None => None,
            };
            if let Some(hist) = wire_hist {
                comm.transport_mut().set_histogram(hist);
            }
        }

        let callbacks = &self.callbacks;
        let scheds = &self.scheds;
        for path in &mut self.node_paths {
            let mut parts = Vec::with_capacity(path.segments().len());
            for segment in path.segments() {
                let hist = match segment {
                    NodeSegment::Callback(id) => callbacks[id.index()].histogram(),
                    NodeSegment::Sched(id) => scheds[id.index()].histogram(),
                };
                let hist = hist.ok_or_else(|| {
                    anyhow::anyhow!("path '{}' references an edge without a histogram", path.name())
                })?;
                parts.push(hist);
            }
            let hist = Histogram::sum(&parts)
                .with_context(|| format!("composing distribution for path '{}'", path.name()))?;
            path.set_histogram(hist);

            // Single-callback paths keep the callback's raw samples so they
            // can be reported directly instead of through the composition.
            let single = match path.segments() {
                [NodeSegment::Callback(id)] => Some(*id),
                _ => None,
            };
            if let Some(id) = single {
                if let Some(ts) = callbacks[id.index()].timeseries() {
                    path.set_timeseries(ts.clone());
                }
            }
        }

        let node_paths = &self.node_paths;
        let comms = &self.comms;
        for path in &mut self.end_to_end_paths {
            let mut parts = Vec::with_capacity(path.segments().len());
            for segment in path.segments() {
                let hist = match segment {
                    PathSegment::NodePath(id) => node_paths[id.index()].histogram(),
                    PathSegment::Comm(id) => comms[id.index()].histogram(),
                };
                let hist = hist.ok_or_else(|| {
                    anyhow::anyhow!(
                        "path '{}' references a segment without a histogram",
                        path.name()
                    )
                })?;
                parts.push(hist);
            }
            let hist = Histogram::sum(&parts)
                .with_context(|| format!("composing distribution for path '{}'", path.name()))?;
            path.set_histogram(hist);
        }
        Ok(())
    }
}
