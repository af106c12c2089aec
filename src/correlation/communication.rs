// Communication latency: publish and subscribe records matched by stamp.

use tracing::debug;

use crate::stats::Timeseries;
use crate::trace_event::TraceEvent;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct PublishRecord {
    pub object: u64,
    pub stamp: u64,
    pub time_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct SubscribeRecord {
    pub object: u64,
    pub stamp: u64,
    pub time_ms: f64,
    pub source_ms: Option<f64>,
    pub received_ms: Option<f64>,
}

/// Split the event list into time-ordered publish and subscribe tables.
pub(super) fn build_tables(events: &[TraceEvent]) -> (Vec<PublishRecord>, Vec<SubscribeRecord>) {
    let mut publishes = Vec::new();
    let mut subscribes = Vec::new();
    for event in events {
        match event {
            TraceEvent::Publish {
                timestamp,
                object,
                stamp,
            } => publishes.push(PublishRecord {
                object: *object,
                stamp: *stamp,
                time_ms: *timestamp,
            }),
            TraceEvent::Subscribe {
                timestamp,
                object,
                stamp,
                source_timestamp,
                received_timestamp,
            } => subscribes.push(SubscribeRecord {
                object: *object,
                stamp: *stamp,
                time_ms: *timestamp,
                source_ms: *source_timestamp,
                received_ms: *received_timestamp,
            }),
            _ => {}
        }
    }
    (publishes, subscribes)
}

/// Latency samples for one communication edge, in publish order, each
/// captured at its publish timestamp and tagged with the message stamp.
///
/// A publish pairs with the unique subscribe carrying an equal stamp; zero
/// matches (lost or truncated) and several matches (stamp collision) are
/// both unobservable and recorded as unmatched. Trailing unmatched samples
/// are trimmed from storage but kept in the loss counters: a publish near
/// the end of the capture whose subscription fell outside the window is a
/// truncation artifact, not real loss.
///
/// The second series holds wire-level transport latencies where the
/// subscribe records carry send/receive timestamps, `None` when no pair in
/// the edge ever did.
pub(super) fn latency_for(
    publishes: &[PublishRecord],
    subscribes: &[SubscribeRecord],
) -> (Timeseries, Option<Timeseries>) {
    let mut ts = Timeseries::with_capture_times();
    let mut wire = Timeseries::with_capture_times();

    for publish in publishes {
        let mut matches = subscribes.iter().filter(|s| s.stamp == publish.stamp);
        let matched = match (matches.next(), matches.next()) {
            (Some(sub), None) => Some(sub),
            _ => None,
        };
        match matched {
            Some(sub) => {
                ts.push_sequenced(sub.time_ms - publish.time_ms, publish.time_ms, publish.stamp);
                match (sub.source_ms, sub.received_ms) {
                    (Some(source), Some(received)) => {
                        wire.push_sequenced(received - source, publish.time_ms, publish.stamp);
                    }
                    _ => wire.push_sequenced(f64::NAN, publish.time_ms, publish.stamp),
                }
            }
            None => {
                ts.push_sequenced(f64::NAN, publish.time_ms, publish.stamp);
                wire.push_sequenced(f64::NAN, publish.time_ms, publish.stamp);
            }
        }
    }

    let trimmed = ts.trim_trailing_unmatched();
    if trimmed > 0 {
        debug!(trimmed, "trailing unobserved publishes trimmed");
    }
    wire.trim_trailing_unmatched();

    if wire.finite_samples().is_empty() {
        (ts, None)
    } else {
        (ts, Some(wire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publish(stamp: u64, time_ms: f64) -> PublishRecord {
        PublishRecord {
            object: 1,
            stamp,
            time_ms,
        }
    }

    fn subscribe(stamp: u64, time_ms: f64) -> SubscribeRecord {
        SubscribeRecord {
            object: 2,
            stamp,
            time_ms,
            source_ms: None,
            received_ms: None,
        }
    }

    #[test]
    fn test_lost_message_is_unmatched() {
        let publishes = [publish(1, 10.0), publish(2, 20.0), publish(3, 30.0)];
        let subscribes = [subscribe(1, 15.0), subscribe(3, 35.0)];
        let (ts, wire) = latency_for(&publishes, &subscribes);

        assert_eq!(ts.len(), 3);
        assert_eq!(ts.samples()[0], 5.0);
        assert!(ts.samples()[1].is_nan());
        assert_eq!(ts.samples()[2], 5.0);
        assert_eq!(ts.unmatched_count(), 1);
        assert!(wire.is_none());
    }

    #[test]
    fn test_trailing_unmatched_trimmed_but_counted() {
        let publishes = [publish(1, 10.0), publish(2, 20.0)];
        let subscribes = [subscribe(1, 15.0)];
        let (ts, _) = latency_for(&publishes, &subscribes);

        assert_eq!(ts.samples(), &[5.0]);
        assert_eq!(ts.total_recorded(), 2);
        assert_eq!(ts.unmatched_count(), 1);
        assert!((ts.loss_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_stamp_collision_is_unmatched() {
        let publishes = [publish(1, 10.0), publish(2, 20.0)];
        let subscribes = [subscribe(1, 15.0), subscribe(1, 16.0), subscribe(2, 25.0)];
        let (ts, _) = latency_for(&publishes, &subscribes);

        assert!(ts.samples()[0].is_nan());
        assert_eq!(ts.samples()[1], 5.0);
    }

    #[test]
    fn test_capture_time_is_publish_time() {
        let publishes = [publish(7, 100.0)];
        let subscribes = [subscribe(7, 130.0)];
        let (ts, _) = latency_for(&publishes, &subscribes);

        assert_eq!(ts.samples(), &[30.0]);
        assert_eq!(ts.capture_times_ms().unwrap(), &[100.0]);
        assert_eq!(ts.sequence().unwrap(), &[7]);
    }

    #[test]
    fn test_wire_latency_when_transport_stamped() {
        let publishes = [publish(1, 10.0), publish(2, 20.0)];
        let mut sub1 = subscribe(1, 15.0);
        sub1.source_ms = Some(11.0);
        sub1.received_ms = Some(13.5);
        let subscribes = [sub1, subscribe(2, 26.0)];

        let (ts, wire) = latency_for(&publishes, &subscribes);
        assert_eq!(ts.samples(), &[5.0, 6.0]);

        let wire = wire.unwrap();
        assert_eq!(wire.len(), 1);
        assert!((wire.samples()[0] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_build_tables_splits_by_kind() {
        let events = vec![
            TraceEvent::Publish {
                timestamp: 10.0,
                object: 1,
                stamp: 1,
            },
            TraceEvent::CallbackStart {
                timestamp: 11.0,
                object: 9,
            },
            TraceEvent::Subscribe {
                timestamp: 15.0,
                object: 2,
                stamp: 1,
                source_timestamp: None,
                received_timestamp: None,
            },
        ];
        let (publishes, subscribes) = build_tables(&events);
        assert_eq!(publishes.len(), 1);
        assert_eq!(subscribes.len(), 1);
        assert_eq!(publishes[0].stamp, subscribes[0].stamp);
    }

    #[test]
    fn test_all_unmatched_trims_to_empty() {
        let publishes = [publish(1, 10.0), publish(2, 20.0)];
        let subscribes = [subscribe(9, 15.0)];
        let (ts, wire) = latency_for(&publishes, &subscribes);

        assert!(ts.is_empty());
        assert_eq!(ts.total_recorded(), 2);
        assert_eq!(ts.unmatched_count(), 2);
        assert!(wire.is_none());
    }
}
