// Intra-node scheduling edges.

use crate::stats::{Histogram, Timeseries};

use super::{CallbackId, NodeId, SchedId};

/// A directed edge meaning "the consumer callback runs in reaction to the
/// producer callback completing". Not 1:1; a producer may fan out to
/// several consumers, each with its own edge.
#[derive(Debug, Clone)]
pub struct Sched {
    id: SchedId,
    node: NodeId,
    name: String,
    producer: CallbackId,
    consumer: CallbackId,
    timeseries: Option<Timeseries>,
    histogram: Option<Histogram>,
}

impl Sched {
    pub fn new(
        id: SchedId,
        node: NodeId,
        producer: CallbackId,
        consumer: CallbackId,
        producer_symbol: &str,
        consumer_symbol: &str,
    ) -> Self {
        Self {
            id,
            node,
            name: format!("{producer_symbol} -> {consumer_symbol}"),
            producer,
            consumer,
            timeseries: None,
            histogram: None,
        }
    }

    pub fn id(&self) -> SchedId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Callback whose completion triggers the consumer.
    pub fn producer(&self) -> CallbackId {
        self.producer
    }

    /// Callback scheduled by the producer's completion.
    pub fn consumer(&self) -> CallbackId {
        self.consumer
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
