//! Transient trimming.
//!
//! Applications spend their first moments allocating, discovering peers and
//! filling queues, and their last moments draining. Samples captured inside
//! a configurable warm-up/cool-down window are dropped before histograms are
//! built so those transients do not skew the distributions.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::Application;

/// Warm-up/cool-down window, measured from the first and last event of the
/// capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransientWindow {
    /// Milliseconds discarded from the start of the capture.
    #[serde(default)]
    pub warmup_ms: f64,
    /// Milliseconds discarded from the end of the capture.
    #[serde(default)]
    pub cooldown_ms: f64,
}

impl TransientWindow {
    pub fn is_noop(&self) -> bool {
        self.warmup_ms <= 0.0 && self.cooldown_ms <= 0.0
    }

    /// Filter every attached timeseries down to the samples captured inside
    /// `[first + warmup, last - cooldown]`. Samples without a capture
    /// timestamp cannot be placed in the window and are kept. Returns the
    /// number of samples dropped.
    pub fn apply(&self, app: &mut Application, span_ms: (f64, f64)) -> usize {
        if self.is_noop() {
            return 0;
        }
        let (first, last) = span_ms;
        let lo = first + self.warmup_ms;
        let hi = last - self.cooldown_ms;
        if lo > hi {
            warn!(lo, hi, "transient window leaves no capture interval");
        }
        let keep = |t: f64| t >= lo && t <= hi;

        let mut dropped = 0;
        for cb in app.callbacks_mut() {
            if let Some(ts) = cb.timeseries_mut() {
                let kept = ts.filtered_by_capture(keep);
                dropped += ts.len() - kept.len();
                *ts = kept;
            }
        }
        for sched in app.scheds_mut() {
            if let Some(ts) = sched.timeseries_mut() {
                let kept = ts.filtered_by_capture(keep);
                dropped += ts.len() - kept.len();
                *ts = kept;
            }
        }
        for comm in app.comms_mut() {
            if let Some(ts) = comm.timeseries_mut() {
                let kept = ts.filtered_by_capture(keep);
                dropped += ts.len() - kept.len();
                *ts = kept;
            }
            if let Some(ts) = comm.transport_mut().timeseries_mut() {
                let kept = ts.filtered_by_capture(keep);
                dropped += ts.len() - kept.len();
                *ts = kept;
            }
        }
        debug!(dropped, lo, hi, "transient trimming applied");
        dropped
    }
}
