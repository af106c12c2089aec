// Callback duration extraction: paired start/end events per runtime object.

use tracing::debug;

use crate::stats::Timeseries;
use crate::trace_event::TraceEvent;

/// Durations of every completed invocation of the callback identified by
/// `object`, in event order, each captured at its start timestamp. Also
/// returns how many raw events referenced the object at all, so the caller
/// can distinguish "never traced" from "traced but never completed".
///
/// An end without a pending start and a start without a following end are
/// capture-window truncation artifacts and are dropped, not counted as
/// losses. A second start while one is pending replaces it; the interrupted
/// invocation never completed and has no duration.
pub(super) fn durations_for(object: u64, events: &[TraceEvent]) -> (Timeseries, usize) {
    let mut ts = Timeseries::with_capture_times();
    let mut matched_events = 0;
    let mut pending_start: Option<f64> = None;

    for event in events {
        match event {
            TraceEvent::CallbackStart {
                timestamp,
                object: o,
            } if *o == object => {
                matched_events += 1;
                if pending_start.is_some() {
                    debug!(object, timestamp, "callback restarted before completing");
                }
                pending_start = Some(*timestamp);
            }
            TraceEvent::CallbackEnd {
                timestamp,
                object: o,
            } if *o == object => {
                matched_events += 1;
                match pending_start.take() {
                    Some(start) => ts.push_at(timestamp - start, start),
                    None => debug!(object, timestamp, "callback end before any start"),
                }
            }
            _ => {}
        }
    }
    if pending_start.is_some() {
        debug!(object, "callback still running when the capture ended");
    }
    (ts, matched_events)
}
