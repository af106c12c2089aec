// Callbacks and their declared publish edges.

use crate::stats::{Histogram, Timeseries};

use super::{CallbackId, NodeId};

/// What triggers a callback. Closed set; every consumer matches exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackKind {
    Timer { period: f64 },
    Subscription { topic: String },
}

impl CallbackKind {
    /// The subscribed topic, for subscription callbacks.
    pub fn subscribed_topic(&self) -> Option<&str> {
        match self {
            CallbackKind::Timer { .. } => None,
            CallbackKind::Subscription { topic } => Some(topic),
        }
    }

    pub fn is_subscription(&self) -> bool {
        matches!(self, CallbackKind::Subscription { .. })
    }
}

/// A declared output edge onto a topic, with its late-bound publisher
/// identity from the trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Publish {
    topic: String,
    runtime_object: Option<u64>,
}

impl Publish {
    pub fn new(topic: String) -> Self {
        Self {
            topic,
            runtime_object: None,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn bind_object(&mut self, object: u64) {
        self.runtime_object = Some(object);
    }

    pub fn object(&self) -> Option<u64> {
        self.runtime_object
    }
}

/// One declared callback of a node.
///
/// `subsequent` holds the intra-node scheduling targets resolved from the
/// declared symbols; the runtime object is bound from trace metadata before
/// correlation and identifies this callback in the raw event stream.
#[derive(Debug, Clone)]
pub struct Callback {
    id: CallbackId,
    node: NodeId,
    symbol: String,
    kind: CallbackKind,
    publishes: Vec<Publish>,
    subsequent: Vec<CallbackId>,
    runtime_object: Option<u64>,
    timeseries: Option<Timeseries>,
    histogram: Option<Histogram>,
}

impl Callback {
    pub fn new(id: CallbackId, node: NodeId, symbol: String, kind: CallbackKind) -> Self {
        Self {
            id,
            node,
            symbol,
            kind,
            publishes: Vec::new(),
            subsequent: Vec::new(),
            runtime_object: None,
            timeseries: None,
            histogram: None,
        }
    }

    pub fn id(&self) -> CallbackId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn kind(&self) -> &CallbackKind {
        &self.kind
    }

    pub fn add_publish(&mut self, topic: String) {
        self.publishes.push(Publish::new(topic));
    }

    pub fn publishes(&self) -> &[Publish] {
        &self.publishes
    }

    pub fn publishes_mut(&mut self) -> &mut [Publish] {
        &mut self.publishes
    }

    /// Whether this callback publishes anything, i.e. terminates an
    /// intra-node chain.
    pub fn has_publish(&self) -> bool {
        !self.publishes.is_empty()
    }

    pub fn publish_on(&self, topic: &str) -> Option<&Publish> {
        self.publishes.iter().find(|p| p.topic() == topic)
    }

    pub fn add_subsequent(&mut self, id: CallbackId) {
        self.subsequent.push(id);
    }

    pub fn subsequent(&self) -> &[CallbackId] {
        &self.subsequent
    }

    pub fn bind_object(&mut self, object: u64) {
        self.runtime_object = Some(object);
    }

    pub fn object(&self) -> Option<u64> {
        self.runtime_object
    }

    pub fn set_timeseries(&mut self, ts: Timeseries) {
        self.timeseries = Some(ts);
    }

    pub fn timeseries(&self) -> Option<&Timeseries> {
        self.timeseries.as_ref()
    }

    pub fn timeseries_mut(&mut self) -> Option<&mut Timeseries> {
        self.timeseries.as_mut()
    }

    pub fn set_histogram(&mut self, hist: Histogram) {
        self.histogram = Some(hist);
    }

    pub fn histogram(&self) -> Option<&Histogram> {
        self.histogram.as_ref()
    }
}
