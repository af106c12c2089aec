// Event correlation: mapping the raw capture onto graph edges.
//
// Three independent passes, one per edge kind, each over the full
// time-ordered event list:
// - callback durations, paired start/end events per runtime object
// - communication latency, publish/subscribe records matched by stamp
// - scheduling latency, a forward cursor over consumer starts
//
// Every pass stages its samples first; nothing is attached to the graph
// until every declared edge has correlated, so a failed run leaves the
// application untouched.

mod callback_duration;
mod communication;
mod scheduling;

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::model::{Application, CallbackId, CommId, NodeId, SchedId};
use crate::stats::Timeseries;
use crate::trace_event::{Bindings, Trace, TraceEvent};

/// A declared edge that does not fit the capture. All of these are fatal for
/// the run; they indicate a mismatched architecture/trace pairing, not a
/// transient condition.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrelationError {
    #[error("callback '{symbol}' of node '{node}' has no runtime binding in the trace")]
    UnboundCallback { node: String, symbol: String },

    #[error("no publisher binding for topic '{topic}' of node '{node}'")]
    UnboundPublisher { node: String, topic: String },

    #[error("no events matched {edge}; the declared architecture does not fit this trace")]
    NoMatchingEvents { edge: String },
}

pub type Result<T> = std::result::Result<T, CorrelationError>;

/// Correlate the capture against every declared edge and attach the
/// resulting sample sequences.
///
/// # Errors
///
/// [`CorrelationError`] when a callback or needed publisher has no runtime
/// binding, or when a declared edge matches no events at all. On error the
/// application carries no partial sample data.
pub fn correlate(app: &mut Application, trace: &Trace) -> Result<()> {
    bind_runtime(app, &trace.bindings)?;

    let mut callback_series: Vec<(CallbackId, Timeseries)> = Vec::new();
    for cb in app.callbacks() {
        let object = require_object(app, cb.id())?;
        let (ts, matched_events) = callback_duration::durations_for(object, &trace.events);
        if matched_events == 0 {
            return Err(CorrelationError::NoMatchingEvents {
                edge: format!(
                    "callback '{}' of node '{}'",
                    cb.symbol(),
                    app.node(cb.node()).qualified_name()
                ),
            });
        }
        callback_series.push((cb.id(), ts));
    }

    let (publish_records, subscribe_records) = communication::build_tables(&trace.events);

    let mut comm_series: Vec<(CommId, Timeseries, Option<Timeseries>)> = Vec::new();
    for comm in app.comms() {
        let producer = app.callback(comm.producer_callback());
        let producer_object = producer
            .publish_on(comm.topic())
            .and_then(|p| p.object())
            .ok_or_else(|| CorrelationError::UnboundPublisher {
                node: app.node(comm.producer_node()).qualified_name(),
                topic: comm.topic().to_string(),
            })?;
        let consumer_object = require_object(app, comm.consumer_callback())?;

        let publishes: Vec<communication::PublishRecord> = publish_records
            .iter()
            .copied()
            .filter(|r| r.object == producer_object)
            .collect();
        let subscribes: Vec<communication::SubscribeRecord> = subscribe_records
            .iter()
            .copied()
            .filter(|r| r.object == consumer_object)
            .collect();
        if publishes.is_empty() || subscribes.is_empty() {
            return Err(CorrelationError::NoMatchingEvents {
                edge: format!("communication edge '{}'", comm.name()),
            });
        }

        let (ts, wire) = communication::latency_for(&publishes, &subscribes);
        comm_series.push((comm.id(), ts, wire));
    }

    let mut sched_series: Vec<(SchedId, Timeseries)> = Vec::new();
    for sched in app.scheds() {
        let producer_object = require_object(app, sched.producer())?;
        let consumer_object = require_object(app, sched.consumer())?;

        let ends: Vec<f64> = trace
            .events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::CallbackEnd { timestamp, object } if *object == producer_object => {
                    Some(*timestamp)
                }
                _ => None,
            })
            .collect();
        let starts: Vec<f64> = trace
            .events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::CallbackStart { timestamp, object } if *object == consumer_object => {
                    Some(*timestamp)
                }
                _ => None,
            })
            .collect();
        if ends.is_empty() || starts.is_empty() {
            return Err(CorrelationError::NoMatchingEvents {
                edge: format!("scheduling edge '{}'", sched.name()),
            });
        }
        sched_series.push((sched.id(), scheduling::latency_for(&ends, &starts)));
    }

    let attached_callbacks = callback_series.len();
    let attached_comms = comm_series.len();
    let attached_scheds = sched_series.len();
    for (id, ts) in callback_series {
        app.callback_mut(id).set_timeseries(ts);
    }
    for (id, ts) in sched_series {
        app.sched_mut(id).set_timeseries(ts);
    }
    for (id, ts, wire) in comm_series {
        app.comm_mut(id).set_timeseries(ts);
        if let Some(wire) = wire {
            app.comm_mut(id).transport_mut().set_timeseries(wire);
        }
    }

    debug!(
        callbacks = attached_callbacks,
        comms = attached_comms,
        scheds = attached_scheds,
        "correlation complete"
    );
    Ok(())
}

fn require_object(app: &Application, id: CallbackId) -> Result<u64> {
    let cb = app.callback(id);
    cb.object().ok_or_else(|| CorrelationError::UnboundCallback {
        node: app.node(cb.node()).qualified_name(),
        symbol: cb.symbol().to_string(),
    })
}

/// Bind trace object identities onto the declared graph.
///
/// Every callback must have a binding. Publisher bindings are applied where
/// present; a communication edge whose producer stays unbound fails later,
/// at the point where its object is actually needed.
fn bind_runtime(app: &mut Application, bindings: &Bindings) -> Result<()> {
    let callback_index: HashMap<(&str, &str), u64> = bindings
        .callbacks
        .iter()
        .map(|b| ((b.node.as_str(), b.symbol.as_str()), b.object))
        .collect();
    let publisher_index: HashMap<(&str, &str), u64> = bindings
        .publishers
        .iter()
        .map(|b| ((b.node.as_str(), b.topic.as_str()), b.object))
        .collect();

    let mut callback_objects: Vec<(CallbackId, u64)> = Vec::new();
    for cb in app.callbacks() {
        let node = app.node(cb.node()).qualified_name();
        let object = callback_index
            .get(&(node.as_str(), cb.symbol()))
            .copied()
            .ok_or_else(|| CorrelationError::UnboundCallback {
                node: node.clone(),
                symbol: cb.symbol().to_string(),
            })?;
        callback_objects.push((cb.id(), object));
    }
    for (id, object) in callback_objects {
        app.callback_mut(id).bind_object(object);
    }

    let mut publish_objects: Vec<(CallbackId, usize, u64)> = Vec::new();
    for cb in app.callbacks() {
        let node = app.node(cb.node()).qualified_name();
        for (i, publish) in cb.publishes().iter().enumerate() {
            match publisher_index.get(&(node.as_str(), publish.topic())) {
                Some(&object) => publish_objects.push((cb.id(), i, object)),
                None => debug!(node = %node, topic = publish.topic(), "publisher left unbound"),
            }
        }
    }
    for (id, i, object) in publish_objects {
        app.callback_mut(id).publishes_mut()[i].bind_object(object);
    }

    let mut unlinked_objects: Vec<(NodeId, usize, u64)> = Vec::new();
    for node in app.nodes() {
        let qualified = node.qualified_name();
        for (i, publish) in node.unlinked_publishes().iter().enumerate() {
            if let Some(&object) = publisher_index.get(&(qualified.as_str(), publish.topic())) {
                unlinked_objects.push((node.id(), i, object));
            }
        }
    }
    for (id, i, object) in unlinked_objects {
        app.node_mut(id).unlinked_publishes_mut()[i].bind_object(object);
    }
    Ok(())
}

#[cfg(test)]
mod tests;
