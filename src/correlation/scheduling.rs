// Scheduling latency: a forward cursor over consumer starts.

use tracing::{debug, warn};

use crate::stats::Timeseries;

/// Latency samples for one scheduling edge, one per producer completion in
/// time order, each captured at the producer's end timestamp.
///
/// A single cursor walks the consumer-start sequence. Producer end `e[i]`
/// claims the start under the cursor when `e[i]` is the last end or the
/// start precedes `e[i+1]`; otherwise the consumer evidently coalesced
/// several completions into one invocation and `e[i]` records an unmatched
/// sample, leaving the cursor for a later end. Each consumer start is
/// attributed to at most one producer end. Consumer invocations before the
/// first producer completion, or left over when the completions run out,
/// cannot be attributed and are counted as unmatched without being stored.
pub(super) fn latency_for(producer_ends: &[f64], consumer_starts: &[f64]) -> Timeseries {
    let mut ts = Timeseries::with_capture_times();
    let mut cursor = 0;

    if let Some(&first_end) = producer_ends.first() {
        while cursor < consumer_starts.len() && consumer_starts[cursor] < first_end {
            cursor += 1;
            ts.count_stray_unmatched(1);
        }
        if cursor > 0 {
            debug!(
                skipped = cursor,
                "consumer invocations before the first producer completion"
            );
        }
    }

    for (i, &end) in producer_ends.iter().enumerate() {
        let next_end = producer_ends.get(i + 1);
        match consumer_starts.get(cursor) {
            Some(&start) if next_end.is_none_or(|&next| start < next) => {
                let sample = start - end;
                if sample < 0.0 {
                    warn!(start, end, "consumer start precedes its producer completion");
                }
                ts.push_at(sample, end);
                cursor += 1;
            }
            _ => ts.push_at(f64::NAN, end),
        }
    }

    let leftover = consumer_starts.len() - cursor;
    if leftover > 0 {
        ts.count_stray_unmatched(leftover);
        debug!(leftover, "consumer invocations after the last producer completion window");
    }
    ts
}
