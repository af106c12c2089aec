// Ordered latency samples for one graph edge.
//
// NaN is a first-class sample value meaning "this invocation produced no
// observable latency". Unmatched samples stay in the sequence so loss rates
// can be computed, and the total/unmatched counters survive even when
// trailing unmatched samples are trimmed from storage.

/// An ordered sequence of latency samples in capture order.
///
/// Samples may be NaN (unmatched). Each sample is optionally paired with the
/// capture timestamp of its triggering event and, where the transport carries
/// one, a logical sequence token such as a message stamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeseries {
    samples: Vec<f64>,
    capture_times_ms: Option<Vec<f64>>,
    sequence: Option<Vec<u64>>,
    total: usize,
    unmatched: usize,
}

impl Timeseries {
    /// Empty timeseries without capture-time pairing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty timeseries that will pair every sample with a capture timestamp.
    pub fn with_capture_times() -> Self {
        Self {
            capture_times_ms: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Build directly from a sample vector. NaN entries count as unmatched.
    pub fn from_samples(samples: Vec<f64>) -> Self {
        let unmatched = samples.iter().filter(|s| s.is_nan()).count();
        let total = samples.len();
        Self {
            samples,
            capture_times_ms: None,
            sequence: None,
            total,
            unmatched,
        }
    }

    /// Append a sample without a capture timestamp.
    pub fn push(&mut self, sample: f64) {
        self.samples.push(sample);
        if let Some(times) = &mut self.capture_times_ms {
            times.push(f64::NAN);
        }
        if let Some(seq) = &mut self.sequence {
            seq.push(0);
        }
        self.count(sample);
    }

    /// Append a sample captured at `capture_ms`.
    pub fn push_at(&mut self, sample: f64, capture_ms: f64) {
        match &mut self.capture_times_ms {
            Some(times) => times.push(capture_ms),
            None => {
                let mut times = vec![f64::NAN; self.samples.len()];
                times.push(capture_ms);
                self.capture_times_ms = Some(times);
            }
        }
        self.samples.push(sample);
        if let Some(seq) = &mut self.sequence {
            seq.push(0);
        }
        self.count(sample);
    }

    /// Append a sample with both a capture timestamp and a sequence token.
    pub fn push_sequenced(&mut self, sample: f64, capture_ms: f64, token: u64) {
        match &mut self.sequence {
            Some(seq) => seq.push(token),
            None => {
                let mut seq = vec![0; self.samples.len()];
                seq.push(token);
                self.sequence = Some(seq);
            }
        }
        match &mut self.capture_times_ms {
            Some(times) => times.push(capture_ms),
            None => {
                let mut times = vec![f64::NAN; self.samples.len()];
                times.push(capture_ms);
                self.capture_times_ms = Some(times);
            }
        }
        self.samples.push(sample);
        self.count(sample);
    }

    fn count(&mut self, sample: f64) {
        self.total += 1;
        if sample.is_nan() {
            self.unmatched += 1;
        }
    }

    /// Count events that correlated with no counterpart and are never stored,
    /// e.g. consumer starts arriving before any producer completion.
    pub fn count_stray_unmatched(&mut self, n: usize) {
        self.total += n;
        self.unmatched += n;
    }

    /// Drop trailing unmatched samples from storage. The total/unmatched
    /// counters keep accounting for them. Returns how many were trimmed.
    pub fn trim_trailing_unmatched(&mut self) -> usize {
        let keep = self
            .samples
            .iter()
            .rposition(|s| !s.is_nan())
            .map_or(0, |i| i + 1);
        let trimmed = self.samples.len() - keep;
        self.samples.truncate(keep);
        if let Some(times) = &mut self.capture_times_ms {
            times.truncate(keep);
        }
        if let Some(seq) = &mut self.sequence {
            seq.truncate(keep);
        }
        trimmed
    }

    /// Copy with only the samples for which `keep(capture_time)` holds.
    /// Samples without a capture timestamp cannot be placed and are kept.
    /// Counter deltas for samples trimmed from storage carry over.
    pub fn filtered_by_capture<F: Fn(f64) -> bool>(&self, keep: F) -> Self {
        let stored_unmatched = self.samples.iter().filter(|s| s.is_nan()).count();
        let delta_total = self.total - self.samples.len();
        let delta_unmatched = self.unmatched - stored_unmatched;

        let mut out = Self {
            capture_times_ms: self.capture_times_ms.as_ref().map(|_| Vec::new()),
            sequence: self.sequence.as_ref().map(|_| Vec::new()),
            ..Self::default()
        };
        for (i, &sample) in self.samples.iter().enumerate() {
            let time = self
                .capture_times_ms
                .as_ref()
                .map_or(f64::NAN, |times| times[i]);
            if time.is_nan() || keep(time) {
                out.samples.push(sample);
                if let Some(times) = &mut out.capture_times_ms {
                    times.push(time);
                }
                if let Some(seq) = &mut out.sequence {
                    seq.push(self.sequence.as_ref().map_or(0, |s| s[i]));
                }
                out.count(sample);
            }
        }
        out.total += delta_total;
        out.unmatched += delta_unmatched;
        out
    }

    /// All stored samples, NaN included, in capture order.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Capture timestamps parallel to `samples`, when recorded.
    pub fn capture_times_ms(&self) -> Option<&[f64]> {
        self.capture_times_ms.as_deref()
    }

    /// Sequence tokens parallel to `samples`, when recorded.
    pub fn sequence(&self) -> Option<&[u64]> {
        self.sequence.as_deref()
    }

    /// The finite-only subsequence.
    pub fn finite_samples(&self) -> Vec<f64> {
        self.samples.iter().copied().filter(|s| s.is_finite()).collect()
    }

    /// Number of stored samples, NaN included.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total recorded invocations, including samples trimmed from storage.
    pub fn total_recorded(&self) -> usize {
        self.total
    }

    /// Recorded invocations that produced no observable latency.
    pub fn unmatched_count(&self) -> usize {
        self.unmatched
    }

    /// Recorded invocations with an observed latency.
    pub fn matched_count(&self) -> usize {
        self.total - self.unmatched
    }

    /// Fraction of recorded invocations that went unmatched.
    pub fn loss_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.unmatched as f64 / self.total as f64
    }
}
