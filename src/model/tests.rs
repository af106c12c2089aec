// Graph construction and path derivation tests.
//
// The fixtures build architecture documents in memory; a three-node
// sensor/filter/sink pipeline is the shared baseline and the remaining
// fixtures vary one declaration at a time.

use super::*;
use crate::arch::{ArchitectureDoc, CallbackDoc, NodeDoc};
use crate::stats::Timeseries;

fn timer(symbol: &str, period: f64, subsequent: &[&str], publishes: &[&str]) -> CallbackDoc {
    CallbackDoc::Timer {
        period,
        symbol: symbol.to_string(),
        subsequent_callback_symbols: subsequent.iter().map(|s| s.to_string()).collect(),
        publish_topic_names: publishes.iter().map(|s| s.to_string()).collect(),
    }
}

fn subscribe(symbol: &str, topic: &str, subsequent: &[&str], publishes: &[&str]) -> CallbackDoc {
    CallbackDoc::Subscribe {
        topic_name: topic.to_string(),
        symbol: symbol.to_string(),
        subsequent_callback_symbols: subsequent.iter().map(|s| s.to_string()).collect(),
        publish_topic_names: publishes.iter().map(|s| s.to_string()).collect(),
    }
}

fn node(name: &str, start: bool, end: bool, callbacks: Vec<CallbackDoc>) -> NodeDoc {
    NodeDoc {
        name: name.to_string(),
        namespace: "/".to_string(),
        start_node: start,
        end_node: end,
        callbacks,
        unlinked_publish_topic_names: Vec::new(),
    }
}

/// sensor (timer, publishes /raw) -> filter (subscription feeding a worker
/// that publishes /clean) -> sink (end node subscribing /clean).
fn pipeline() -> ArchitectureDoc {
    ArchitectureDoc {
        nodes: vec![
            node(
                "sensor",
                true,
                false,
                vec![timer("sensor_tick", 0.01, &[], &["/raw"])],
            ),
            node(
                "filter",
                false,
                false,
                vec![
                    subscribe("filter_input", "/raw", &["filter_worker"], &[]),
                    timer("filter_worker", 0.005, &[], &["/clean"]),
                ],
            ),
            node(
                "sink",
                false,
                true,
                vec![subscribe("sink_input", "/clean", &[], &[])],
            ),
        ],
    }
}

#[test]
fn test_pipeline_assembly_counts() {
    let app = Application::from_architecture(&pipeline(), &[]).unwrap();
    assert_eq!(app.nodes().len(), 3);
    assert_eq!(app.callbacks().len(), 4);
    assert_eq!(app.scheds().len(), 1);
    assert_eq!(app.comms().len(), 2);
    // filter is searched from both callbacks, so it contributes the chain
    // and the lone worker path.
    assert_eq!(app.node_paths().len(), 4);
    assert_eq!(app.end_to_end_paths().len(), 1);
}

#[test]
fn test_end_to_end_path_shape() {
    let app = Application::from_architecture(&pipeline(), &[]).unwrap();
    let path = &app.end_to_end_paths()[0];
    assert_eq!(path.name(), "sensor--filter--sink");
    // node path, comm, node path, comm, node path
    assert_eq!(path.segments().len(), 5);
    assert!(matches!(path.segments()[0], PathSegment::NodePath(_)));
    assert!(matches!(path.segments()[1], PathSegment::Comm(_)));
}

#[test]
fn test_node_path_names_disambiguated() {
    let app = Application::from_architecture(&pipeline(), &[]).unwrap();
    let filter_paths: Vec<&str> = app
        .node_paths()
        .iter()
        .filter(|p| app.node(p.node()).name() == "filter")
        .map(|p| p.name())
        .collect();
    assert_eq!(filter_paths, vec!["filter", "filter_1"]);
}

#[test]
fn test_sched_edge_links_declared_chain() {
    let app = Application::from_architecture(&pipeline(), &[]).unwrap();
    let sched = &app.scheds()[0];
    assert_eq!(sched.name(), "filter_input -> filter_worker");
    assert_eq!(app.callback(sched.producer()).symbol(), "filter_input");
    assert_eq!(app.callback(sched.consumer()).symbol(), "filter_worker");
}

#[test]
fn test_end_node_paths_ignore_non_subscriptions() {
    let mut doc = pipeline();
    // A flush timer on the end node must not create paths or targets.
    doc.nodes[2]
        .callbacks
        .push(timer("sink_flush", 1.0, &[], &["/stats"]));
    let app = Application::from_architecture(&doc, &[]).unwrap();
    let sink = app
        .nodes()
        .iter()
        .find(|n| n.name() == "sink")
        .unwrap();
    assert_eq!(sink.paths().len(), 1);
    let path = app.node_path(sink.paths()[0]);
    assert_eq!(path.segments().len(), 1);
    assert_eq!(app.callback(path.head_callback()).symbol(), "sink_input");
}

#[test]
fn test_ignored_topics_dropped_before_construction() {
    let mut doc = pipeline();
    doc.nodes[0].callbacks = vec![timer("sensor_tick", 0.01, &[], &["/raw", "/rosout"])];
    doc.nodes[1]
        .callbacks
        .push(subscribe("filter_log", "/rosout", &[], &[]));
    let app = Application::from_architecture(&doc, &["/rosout".to_string()]).unwrap();

    assert_eq!(app.callbacks().len(), 4);
    let sensor_cb = app
        .callbacks()
        .iter()
        .find(|c| c.symbol() == "sensor_tick")
        .unwrap();
    assert_eq!(sensor_cb.publishes().len(), 1);
    assert!(app
        .callbacks()
        .iter()
        .all(|c| c.kind().subscribed_topic() != Some("/rosout")));
}

#[test]
fn test_duplicate_node_rejected() {
    let mut doc = pipeline();
    doc.nodes.push(node("sensor", false, false, Vec::new()));
    let err = Application::from_architecture(&doc, &[]).unwrap_err();
    assert!(matches!(err, ConstructionError::DuplicateNode { .. }));
}

#[test]
fn test_same_name_different_namespace_allowed() {
    let mut doc = pipeline();
    let mut twin = node("sensor", false, false, Vec::new());
    twin.namespace = "/left".to_string();
    doc.nodes.push(twin);
    assert!(Application::from_architecture(&doc, &[]).is_ok());
}

#[test]
fn test_duplicate_timer_period_rejected() {
    let doc = ArchitectureDoc {
        nodes: vec![node(
            "clocky",
            true,
            false,
            vec![
                timer("a", 0.5, &[], &["/out"]),
                timer("b", 0.5, &[], &[]),
            ],
        )],
    };
    let err = Application::from_architecture(&doc, &[]).unwrap_err();
    assert!(matches!(
        err,
        ConstructionError::DuplicateTimerPeriod { .. }
    ));
}

#[test]
fn test_duplicate_subscription_rejected() {
    let doc = ArchitectureDoc {
        nodes: vec![node(
            "listener",
            false,
            true,
            vec![
                subscribe("a", "/topic", &[], &[]),
                subscribe("b", "/topic", &[], &[]),
            ],
        )],
    };
    let err = Application::from_architecture(&doc, &[]).unwrap_err();
    assert!(matches!(
        err,
        ConstructionError::DuplicateSubscription { .. }
    ));
}

#[test]
fn test_unknown_symbol_rejected() {
    let doc = ArchitectureDoc {
        nodes: vec![node(
            "solo",
            true,
            false,
            vec![timer("tick", 0.1, &["missing"], &["/out"])],
        )],
    };
    let err = Application::from_architecture(&doc, &[]).unwrap_err();
    assert!(matches!(
        err,
        ConstructionError::UnknownSymbol { ref symbol, .. } if symbol == "missing"
    ));
}

#[test]
fn test_cyclic_chain_rejected() {
    let doc = ArchitectureDoc {
        nodes: vec![node(
            "loopy",
            true,
            false,
            vec![
                timer("a", 0.1, &["b"], &["/out"]),
                timer("b", 0.2, &["a"], &[]),
            ],
        )],
    };
    let err = Application::from_architecture(&doc, &[]).unwrap_err();
    assert!(matches!(err, ConstructionError::Search(_)));
}

#[test]
fn test_comm_shared_between_routes() {
    let mut doc = pipeline();
    // A second publisher onto /raw doubles the routes but must reuse the
    // communication edge into the same consumer.
    doc.nodes[0]
        .callbacks
        .push(timer("sensor_tick_b", 0.02, &[], &["/raw"]));
    let app = Application::from_architecture(&doc, &[]).unwrap();
    assert_eq!(app.end_to_end_paths().len(), 2);
    assert_eq!(app.comms().len(), 2);
}

#[test]
fn test_unlinked_publishes_stay_out_of_paths() {
    let mut doc = pipeline();
    doc.nodes[0]
        .unlinked_publish_topic_names
        .push("/debug".to_string());
    let app = Application::from_architecture(&doc, &[]).unwrap();
    let sensor = app.nodes().iter().find(|n| n.name() == "sensor").unwrap();
    assert_eq!(sensor.unlinked_publishes().len(), 1);
    assert_eq!(app.comms().len(), 2);
    assert_eq!(app.end_to_end_paths().len(), 1);
}

#[test]
fn test_find_path_prefers_end_to_end() {
    let app = Application::from_architecture(&pipeline(), &[]).unwrap();
    assert!(matches!(
        app.find_path("sensor--filter--sink"),
        Some(PathRef::EndToEnd(_))
    ));
    assert!(matches!(app.find_path("filter"), Some(PathRef::NodePath(_))));
    assert!(app.find_path("nope").is_none());

    let names: Vec<&str> = app.all_paths().iter().map(|&p| app.path_name(p)).collect();
    assert_eq!(names[0], "sensor--filter--sink");
    assert_eq!(names.len(), 5);
}

#[test]
fn test_describe_round_trips() {
    let doc = pipeline();
    let app = Application::from_architecture(&doc, &[]).unwrap();
    let described = app.describe();
    assert_eq!(described.nodes.len(), doc.nodes.len());
    assert_eq!(described.nodes[1].callbacks.len(), 2);

    let again = Application::from_architecture(&described, &[]).unwrap();
    assert_eq!(again.node_paths().len(), app.node_paths().len());
    assert_eq!(again.end_to_end_paths().len(), app.end_to_end_paths().len());
    assert_eq!(again.scheds().len(), app.scheds().len());
}

#[test]
fn test_attach_statistics_composes_by_convolution() {
    let mut app = Application::from_architecture(&pipeline(), &[]).unwrap();

    for (symbol, ms) in [
        ("sensor_tick", 1.0),
        ("filter_input", 1.0),
        ("filter_worker", 2.0),
        ("sink_input", 1.0),
    ] {
        let id = app
            .callbacks()
            .iter()
            .find(|c| c.symbol() == symbol)
            .map(|c| c.id())
            .unwrap();
        app.callback_mut(id)
            .set_timeseries(Timeseries::from_samples(vec![ms]));
    }
    let sched_ids: Vec<SchedId> = app.scheds().iter().map(|s| s.id()).collect();
    for id in sched_ids {
        app.sched_mut(id)
            .set_timeseries(Timeseries::from_samples(vec![1.0]));
    }
    for (topic, ms) in [("/raw", 2.0), ("/clean", 1.0)] {
        let id = app
            .comms()
            .iter()
            .find(|c| c.topic() == topic)
            .map(|c| c.id())
            .unwrap();
        app.comm_mut(id)
            .set_timeseries(Timeseries::from_samples(vec![ms]));
    }

    app.attach_statistics(1.0, 10_000).unwrap();

    // 1 (sensor) + 2 (/raw) + 1+1+2 (filter chain) + 1 (/clean) + 1 (sink)
    let path = &app.end_to_end_paths()[0];
    let hist = path.histogram().unwrap();
    assert_eq!(hist.bins().len(), 10);
    assert!((hist.bins()[9] - 1.0).abs() < 1e-9);
    assert!((hist.worst_case_ms() - 9.0).abs() < 1e-9);

    // Only single-callback node paths surface raw samples.
    let sensor_path = app.node_paths().iter().find(|p| p.name() == "sensor").unwrap();
    assert!(sensor_path.timeseries().is_some());
    let filter_chain = app.node_paths().iter().find(|p| p.name() == "filter").unwrap();
    assert!(filter_chain.timeseries().is_none());
    assert_eq!(filter_chain.histogram().unwrap().bins().len(), 5);
}

#[test]
fn test_attach_statistics_requires_samples_everywhere() {
    let mut app = Application::from_architecture(&pipeline(), &[]).unwrap();
    let err = app.attach_statistics(1.0, 10_000).unwrap_err();
    assert!(err.to_string().contains("no correlated samples"));
}
