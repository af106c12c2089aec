// Correlation orchestration tests: binding, staging and the no-partial-state
// guarantee, over small in-memory architectures and traces.

use super::*;
use crate::arch::ArchitectureDoc;
use crate::trace_event::{CallbackBinding, PublisherBinding};

fn two_node_arch() -> ArchitectureDoc {
    serde_json::from_str(
        r#"{"nodes": [
            {"name": "sensor", "namespace": "/", "start_node": true, "callbacks": [
                {"type": "timer_callback", "period": 0.01, "symbol": "tick",
                 "publish_topic_names": ["/T"]}]},
            {"name": "sink", "namespace": "/", "end_node": true, "callbacks": [
                {"type": "subscribe_callback", "topic_name": "/T", "symbol": "on_t"}]}
        ]}"#,
    )
    .unwrap()
}

fn two_node_bindings() -> Bindings {
    Bindings {
        callbacks: vec![
            CallbackBinding {
                node: "/sensor".to_string(),
                symbol: "tick".to_string(),
                object: 11,
            },
            CallbackBinding {
                node: "/sink".to_string(),
                symbol: "on_t".to_string(),
                object: 22,
            },
        ],
        publishers: vec![PublisherBinding {
            node: "/sensor".to_string(),
            topic: "/T".to_string(),
            object: 91,
        }],
    }
}

/// One full sensor-to-sink message exchange starting at `base`.
fn pulse(events: &mut Vec<TraceEvent>, base: f64, stamp: u64, comm_latency: f64) {
    events.push(TraceEvent::CallbackStart {
        timestamp: base,
        object: 11,
    });
    events.push(TraceEvent::Publish {
        timestamp: base + 2.0,
        object: 91,
        stamp,
    });
    events.push(TraceEvent::CallbackEnd {
        timestamp: base + 3.0,
        object: 11,
    });
    let arrival = base + 2.0 + comm_latency;
    events.push(TraceEvent::Subscribe {
        timestamp: arrival,
        object: 22,
        stamp,
        source_timestamp: None,
        received_timestamp: None,
    });
    events.push(TraceEvent::CallbackStart {
        timestamp: arrival,
        object: 22,
    });
    events.push(TraceEvent::CallbackEnd {
        timestamp: arrival + 1.0,
        object: 22,
    });
}

fn two_node_trace() -> Trace {
    let mut events = Vec::new();
    pulse(&mut events, 10.0, 1, 5.0);
    pulse(&mut events, 20.0, 2, 7.0);
    pulse(&mut events, 40.0, 3, 6.0);
    Trace {
        bindings: two_node_bindings(),
        events,
    }
}

#[test]
fn test_correlates_every_edge_kind() {
    let mut app = Application::from_architecture(&two_node_arch(), &[]).unwrap();
    correlate(&mut app, &two_node_trace()).unwrap();

    let tick = app.callbacks().iter().find(|c| c.symbol() == "tick").unwrap();
    assert_eq!(tick.timeseries().unwrap().samples(), &[3.0, 3.0, 3.0]);

    let on_t = app.callbacks().iter().find(|c| c.symbol() == "on_t").unwrap();
    assert_eq!(on_t.timeseries().unwrap().samples(), &[1.0, 1.0, 1.0]);

    let comm = &app.comms()[0];
    assert_eq!(comm.timeseries().unwrap().samples(), &[5.0, 7.0, 6.0]);
    assert_eq!(comm.timeseries().unwrap().sequence().unwrap(), &[1, 2, 3]);
    assert!(comm.transport().timeseries().is_none());
}

#[test]
fn test_missing_callback_binding_fails() {
    let mut app = Application::from_architecture(&two_node_arch(), &[]).unwrap();
    let mut trace = two_node_trace();
    trace.bindings.callbacks.retain(|b| b.symbol != "on_t");

    let err = correlate(&mut app, &trace).unwrap_err();
    assert!(matches!(
        err,
        CorrelationError::UnboundCallback { ref node, .. } if node == "/sink"
    ));
}

#[test]
fn test_unbound_publisher_fails_without_partial_state() {
    let mut app = Application::from_architecture(&two_node_arch(), &[]).unwrap();
    let mut trace = two_node_trace();
    trace.bindings.publishers.clear();

    let err = correlate(&mut app, &trace).unwrap_err();
    assert!(matches!(
        err,
        CorrelationError::UnboundPublisher { ref topic, .. } if topic == "/T"
    ));
    // Callback samples were staged before the failure but must not have
    // reached the graph.
    assert!(app.callbacks().iter().all(|c| c.timeseries().is_none()));
    assert!(app.comms().iter().all(|c| c.timeseries().is_none()));
}

#[test]
fn test_callback_without_events_fails() {
    let mut app = Application::from_architecture(&two_node_arch(), &[]).unwrap();
    let mut trace = two_node_trace();
    trace.events.retain(|e| match e {
        TraceEvent::CallbackStart { object, .. } | TraceEvent::CallbackEnd { object, .. } => {
            *object != 22
        }
        TraceEvent::Subscribe { .. } => false,
        _ => true,
    });

    let err = correlate(&mut app, &trace).unwrap_err();
    assert!(matches!(
        err,
        CorrelationError::NoMatchingEvents { ref edge } if edge.contains("on_t")
    ));
}

#[test]
fn test_comm_without_subscribes_fails() {
    let mut app = Application::from_architecture(&two_node_arch(), &[]).unwrap();
    let mut trace = two_node_trace();
    // The consumer callback still runs (timer-like noise) but never sees a
    // message.
    trace
        .events
        .retain(|e| !matches!(e, TraceEvent::Subscribe { .. }));

    let err = correlate(&mut app, &trace).unwrap_err();
    assert!(matches!(
        err,
        CorrelationError::NoMatchingEvents { ref edge } if edge.contains("communication")
    ));
}

#[test]
fn test_sched_edge_correlated() {
    let doc: ArchitectureDoc = serde_json::from_str(
        r#"{"nodes": [{"name": "worker", "namespace": "/", "start_node": true, "callbacks": [
            {"type": "timer_callback", "period": 0.1, "symbol": "produce",
             "subsequent_callback_symbols": ["consume"], "publish_topic_names": ["/out"]},
            {"type": "timer_callback", "period": 0.2, "symbol": "consume"}
        ]}]}"#,
    )
    .unwrap();
    let mut app = Application::from_architecture(&doc, &[]).unwrap();

    let trace = Trace {
        bindings: Bindings {
            callbacks: vec![
                CallbackBinding {
                    node: "/worker".to_string(),
                    symbol: "produce".to_string(),
                    object: 31,
                },
                CallbackBinding {
                    node: "/worker".to_string(),
                    symbol: "consume".to_string(),
                    object: 32,
                },
            ],
            publishers: Vec::new(),
        },
        events: vec![
            TraceEvent::CallbackStart {
                timestamp: 10.0,
                object: 31,
            },
            TraceEvent::CallbackEnd {
                timestamp: 12.0,
                object: 31,
            },
            TraceEvent::CallbackStart {
                timestamp: 14.0,
                object: 32,
            },
            TraceEvent::CallbackEnd {
                timestamp: 15.0,
                object: 32,
            },
            TraceEvent::CallbackStart {
                timestamp: 20.0,
                object: 31,
            },
            TraceEvent::CallbackEnd {
                timestamp: 22.0,
                object: 31,
            },
            TraceEvent::CallbackStart {
                timestamp: 23.0,
                object: 32,
            },
            TraceEvent::CallbackEnd {
                timestamp: 24.0,
                object: 32,
            },
        ],
    };
    correlate(&mut app, &trace).unwrap();

    let sched = &app.scheds()[0];
    assert_eq!(sched.name(), "produce -> consume");
    assert_eq!(sched.timeseries().unwrap().samples(), &[2.0, 1.0]);
    assert!(app.comms().is_empty());
}

#[test]
fn test_wire_timestamps_reach_transport_link() {
    let mut app = Application::from_architecture(&two_node_arch(), &[]).unwrap();
    let mut trace = two_node_trace();
    for event in &mut trace.events {
        if let TraceEvent::Subscribe {
            timestamp,
            source_timestamp,
            received_timestamp,
            ..
        } = event
        {
            *source_timestamp = Some(*timestamp - 4.0);
            *received_timestamp = Some(*timestamp - 1.0);
        }
    }
    correlate(&mut app, &trace).unwrap();

    let wire = app.comms()[0].transport().timeseries().unwrap();
    assert_eq!(wire.samples(), &[3.0, 3.0, 3.0]);
}
