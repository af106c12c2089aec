// Derived paths: intra-node callback chains and end-to-end compositions.

use crate::stats::{Histogram, Timeseries};

use super::{CallbackId, CommId, EndToEndId, NodeId, NodePathId, SchedId};

/// One segment of an intra-node path. Segments alternate: callback, sched,
/// callback, ..., always starting and ending on a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSegment {
    Callback(CallbackId),
    Sched(SchedId),
}

/// A chain of callbacks within one node, from a chain head to a publishing
/// (or terminal subscription) callback.
///
/// `head` and `tail` are the first and last callback of the chain. The
/// histogram is the convolution of the segment histograms, attached once
/// statistics are computed. Single-callback paths also carry their
/// callback's timeseries; composed paths have no meaningful sample pairing
/// across segments, so their timeseries stays absent.
#[derive(Debug, Clone)]
pub struct NodePath {
    id: NodePathId,
    node: NodeId,
    name: String,
    segments: Vec<NodeSegment>,
    head: CallbackId,
    tail: CallbackId,
    timeseries: Option<Timeseries>,
    histogram: Option<Histogram>,
}

impl NodePath {
    pub fn new(
        id: NodePathId,
        node: NodeId,
        name: String,
        segments: Vec<NodeSegment>,
        head: CallbackId,
        tail: CallbackId,
    ) -> Self {
        Self {
            id,
            node,
            name,
            segments,
            head,
            tail,
            timeseries: None,
            histogram: None,
        }
    }

    pub fn id(&self) -> NodePathId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn segments(&self) -> &[NodeSegment] {
        &self.segments
    }

    /// First callback of the chain.
    pub fn head_callback(&self) -> CallbackId {
        self.head
    }

    /// Last callback of the chain; its publishes link this path onward.
    pub fn tail_callback(&self) -> CallbackId {
        self.tail
    }

    pub fn set_timeseries(&mut self, ts: Timeseries) {
        self.timeseries = Some(ts);
    }

    pub fn timeseries(&self) -> Option<&Timeseries> {
        self.timeseries.as_ref()
    }

    pub fn set_histogram(&mut self, hist: Histogram) {
        self.histogram = Some(hist);
    }

    pub fn histogram(&self) -> Option<&Histogram> {
        self.histogram.as_ref()
    }
}

/// One segment of an end-to-end path. Segments alternate: node path, comm,
/// node path, ..., starting on a start-node path and ending on an end-node
/// path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSegment {
    NodePath(NodePathId),
    Comm(CommId),
}

/// A full causal chain from a start-node path to an end-node path.
///
/// The name joins the node-path names with `--`; comms are not part of the
/// name. The latency distribution is the convolution over every segment.
#[derive(Debug, Clone)]
pub struct EndToEndPath {
    id: EndToEndId,
    name: String,
    segments: Vec<PathSegment>,
    histogram: Option<Histogram>,
}

impl EndToEndPath {
    pub fn new(id: EndToEndId, name: String, segments: Vec<PathSegment>) -> Self {
        Self {
            id,
            name,
            segments,
            histogram: None,
        }
    }

    pub fn id(&self) -> EndToEndId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn set_histogram(&mut self, hist: Histogram) {
        self.histogram = Some(hist);
    }

    pub fn histogram(&self) -> Option<&Histogram> {
        self.histogram.as_ref()
    }
}
