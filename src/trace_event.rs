//! Captured-trace documents.
//!
//! A capture is a JSON document carrying its time unit, the runtime bindings
//! that map declared callbacks and publishers to their object identities in
//! the event stream, and the time-ordered event list itself. Loading scales
//! every timestamp to milliseconds and rejects out-of-order events before
//! anything is correlated.

use std::fs;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Time unit of the raw capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Ms,
    Us,
    Ns,
}

impl Unit {
    /// Multiplier taking a raw timestamp to milliseconds.
    pub fn to_ms(self) -> f64 {
        match self {
            Unit::Ms => 1.0,
            Unit::Us => 1e-3,
            Unit::Ns => 1e-6,
        }
    }
}

/// Trace-side identity of a declared callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackBinding {
    /// Qualified node name, e.g. `/sensor`.
    pub node: String,
    pub symbol: String,
    pub object: u64,
}

/// Trace-side identity of a publisher on one topic of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherBinding {
    pub node: String,
    pub topic: String,
    pub object: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bindings {
    #[serde(default)]
    pub callbacks: Vec<CallbackBinding>,
    #[serde(default)]
    pub publishers: Vec<PublisherBinding>,
}

/// One raw trace event. The closed set the correlator consumes; anything
/// else in a capture is dropped by the exporter before it reaches us.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum TraceEvent {
    CallbackStart {
        timestamp: f64,
        object: u64,
    },
    CallbackEnd {
        timestamp: f64,
        object: u64,
    },
    Publish {
        timestamp: f64,
        object: u64,
        stamp: u64,
    },
    Subscribe {
        timestamp: f64,
        object: u64,
        stamp: u64,
        /// Wire-level send timestamp, when the transport records one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_timestamp: Option<f64>,
        /// Wire-level receive timestamp, when the transport records one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        received_timestamp: Option<f64>,
    },
}

impl TraceEvent {
    pub fn timestamp(&self) -> f64 {
        match self {
            TraceEvent::CallbackStart { timestamp, .. }
            | TraceEvent::CallbackEnd { timestamp, .. }
            | TraceEvent::Publish { timestamp, .. }
            | TraceEvent::Subscribe { timestamp, .. } => *timestamp,
        }
    }

    fn scale(&mut self, factor: f64) {
        match self {
            TraceEvent::CallbackStart { timestamp, .. }
            | TraceEvent::CallbackEnd { timestamp, .. }
            | TraceEvent::Publish { timestamp, .. } => *timestamp *= factor,
            TraceEvent::Subscribe {
                timestamp,
                source_timestamp,
                received_timestamp,
                ..
            } => {
                *timestamp *= factor;
                if let Some(t) = source_timestamp {
                    *t *= factor;
                }
                if let Some(t) = received_timestamp {
                    *t *= factor;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceDoc {
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub bindings: Bindings,
    #[serde(default)]
    pub events: Vec<TraceEvent>,
}

/// A loaded capture with every timestamp in milliseconds.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    pub bindings: Bindings,
    pub events: Vec<TraceEvent>,
}

impl Trace {
    pub fn load(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)
            .with_context(|| format!("failed to open trace file {}", path.display()))?;
        let doc: TraceDoc = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse trace file {}", path.display()))?;
        Self::from_doc(doc)
    }

    /// Scale the document to milliseconds, checking event order on the way.
    pub fn from_doc(doc: TraceDoc) -> Result<Self> {
        let factor = doc.unit.to_ms();
        let mut events = doc.events;
        let mut last = f64::NEG_INFINITY;
        for (i, event) in events.iter_mut().enumerate() {
            event.scale(factor);
            let t = event.timestamp();
            if t < last {
                bail!("trace event {i} out of order: {t}ms after {last}ms");
            }
            last = t;
        }
        Ok(Self {
            bindings: doc.bindings,
            events,
        })
    }

    /// First and last event timestamps, for transient-window placement.
    pub fn span_ms(&self) -> Option<(f64, f64)> {
        let first = self.events.first()?.timestamp();
        let last = self.events.last()?.timestamp();
        Some((first, last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_trace_rejected() {
        let json = r#"{
            "unit": "ns",
            "bindings": {
                "callbacks": [{"node": "/sensor", "symbol": "tick", "object": 7}],
                "publishers": [{"node": "/sensor", "topic": "/raw", "object": 9}]
            },
            "events": [
                {"name": "callback_start", "timestamp": 1000000, "object": 7},
                {"name": "callback_end", "timestamp": 3000000, "object": 7},
                {"name": "publish", "timestamp": 2500000, "object": 9, "stamp": 1}
            ]
        }"#;
        let doc: TraceDoc = serde_json::from_str(json).unwrap();
        assert_eq!(doc.unit, Unit::Ns);
        let err = Trace::from_doc(doc).unwrap_err();
        // publish at 2.5ms follows callback_end at 3.0ms
        assert!(err.to_string().contains("out of order"));
    }

    #[test]
    fn test_ordered_trace_loads() {
        let json = r#"{
            "unit": "us",
            "events": [
                {"name": "callback_start", "timestamp": 1000, "object": 7},
                {"name": "callback_end", "timestamp": 3000, "object": 7}
            ]
        }"#;
        let doc: TraceDoc = serde_json::from_str(json).unwrap();
        let trace = Trace::from_doc(doc).unwrap();
        assert_eq!(trace.events.len(), 2);
        assert!((trace.events[0].timestamp() - 1.0).abs() < 1e-12);
        assert!((trace.events[1].timestamp() - 3.0).abs() < 1e-12);
        assert_eq!(trace.span_ms(), Some((1.0, 3.0)));
    }

    #[test]
    fn test_equal_timestamps_allowed() {
        let doc = TraceDoc {
            unit: Unit::Ms,
            bindings: Bindings::default(),
            events: vec![
                TraceEvent::CallbackStart {
                    timestamp: 5.0,
                    object: 1,
                },
                TraceEvent::CallbackStart {
                    timestamp: 5.0,
                    object: 2,
                },
            ],
        };
        assert!(Trace::from_doc(doc).is_ok());
    }

    #[test]
    fn test_subscribe_wire_timestamps_optional() {
        let json = r#"{"name": "subscribe", "timestamp": 10.0, "object": 3, "stamp": 42}"#;
        let event: TraceEvent = serde_json::from_str(json).unwrap();
        match event {
            TraceEvent::Subscribe {
                source_timestamp,
                received_timestamp,
                stamp,
                ..
            } => {
                assert_eq!(stamp, 42);
                assert!(source_timestamp.is_none());
                assert!(received_timestamp.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_subscribe_wire_timestamps_scaled() {
        let doc = TraceDoc {
            unit: Unit::Us,
            bindings: Bindings::default(),
            events: vec![TraceEvent::Subscribe {
                timestamp: 2000.0,
                object: 3,
                stamp: 1,
                source_timestamp: Some(1000.0),
                received_timestamp: Some(1800.0),
            }],
        };
        let trace = Trace::from_doc(doc).unwrap();
        match &trace.events[0] {
            TraceEvent::Subscribe {
                source_timestamp,
                received_timestamp,
                ..
            } => {
                assert!((source_timestamp.unwrap() - 1.0).abs() < 1e-12);
                assert!((received_timestamp.unwrap() - 1.8).abs() < 1e-12);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_empty_trace_has_no_span() {
        let trace = Trace::default();
        assert!(trace.span_ms().is_none());
    }

    #[test]
    fn test_unit_defaults_to_milliseconds() {
        let doc: TraceDoc = serde_json::from_str(r#"{"events": []}"#).unwrap();
        assert_eq!(doc.unit, Unit::Ms);
        assert!((Unit::Ms.to_ms() - 1.0).abs() < f64::EPSILON);
        assert!((Unit::Ns.to_ms() - 1e-6).abs() < 1e-18);
    }
}
