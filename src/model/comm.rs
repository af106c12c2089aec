// Inter-node communication edges.

use crate::stats::{Histogram, Timeseries};

use super::{CallbackId, CommId, NodeId};

/// The raw send/receive hop wrapped by a communication edge.
///
/// Samples here come from wire-level source/received timestamps when the
/// trace carries them, isolating transport time from end-to-end
/// publish-to-callback latency.
#[derive(Debug, Clone, Default)]
pub struct TransportLink {
    timeseries: Option<Timeseries>,
    histogram: Option<Histogram>,
}

impl TransportLink {
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

/// A topic-matched edge from a publishing callback in one node to a
/// subscription callback in another.
///
/// Instantiated at most once per (topic, consumer callback) pair; routes
/// sharing that pair share the edge and its samples. The display name is
/// the topic, disambiguated by the name registry when one topic fans out
/// to several consumers.
#[derive(Debug, Clone)]
pub struct Comm {
    id: CommId,
    name: String,
    topic: String,
    producer_node: NodeId,
    producer_callback: CallbackId,
    consumer_node: NodeId,
    consumer_callback: CallbackId,
    transport: TransportLink,
    timeseries: Option<Timeseries>,
    histogram: Option<Histogram>,
}

impl Comm {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: CommId,
        name: String,
        topic: String,
        producer_node: NodeId,
        producer_callback: CallbackId,
        consumer_node: NodeId,
        consumer_callback: CallbackId,
    ) -> Self {
        Self {
            id,
            name,
            topic,
            producer_node,
            producer_callback,
            consumer_node,
            consumer_callback,
            transport: TransportLink::default(),
            timeseries: None,
            histogram: None,
        }
    }

    pub fn id(&self) -> CommId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn producer_node(&self) -> NodeId {
        self.producer_node
    }

    pub fn producer_callback(&self) -> CallbackId {
        self.producer_callback
    }

    pub fn consumer_node(&self) -> NodeId {
        self.consumer_node
    }

    pub fn consumer_callback(&self) -> CallbackId {
        self.consumer_callback
    }

    pub fn transport(&self) -> &TransportLink {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut TransportLink {
        &mut self.transport
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
