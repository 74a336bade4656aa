//! Runtime counters and transition timing.
//!
//! Counters are plain `AtomicU64`s bumped on the dispatch path and read on
//! export. Transition latencies go into a small ring buffer behind a
//! `parking_lot::Mutex`; reads are rare (reports, dashboards).
//!
//! None of this feeds back into the state: timing a transition never
//! changes what the transition produces.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Atomic counters for engine events.
#[derive(Debug)]
pub struct SimCounters {
    /// Actions passed to the reducer.
    pub actions_dispatched: AtomicU64,
    /// `CHOOSE_OPTION` actions completed.
    pub choices_applied: AtomicU64,
    /// Memory decay passes.
    pub decay_passes: AtomicU64,
    /// Assumptions added to the bank.
    pub assumptions_recorded: AtomicU64,
    /// Non-finite delta values replaced by zero.
    pub coerced_values: AtomicU64,
    /// Region writes caused by spill-over.
    pub propagated_writes: AtomicU64,
    /// Saves written.
    pub saves_completed: AtomicU64,
    /// Saves evicted to respect capacity.
    pub saves_evicted: AtomicU64,
    /// Saves loaded.
    pub loads_completed: AtomicU64,
}

impl SimCounters {
    /// Zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            actions_dispatched: AtomicU64::new(0),
            choices_applied: AtomicU64::new(0),
            decay_passes: AtomicU64::new(0),
            assumptions_recorded: AtomicU64::new(0),
            coerced_values: AtomicU64::new(0),
            propagated_writes: AtomicU64::new(0),
            saves_completed: AtomicU64::new(0),
            saves_evicted: AtomicU64::new(0),
            loads_completed: AtomicU64::new(0),
        }
    }

    /// Add `n` to a counter.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            actions_dispatched: self.actions_dispatched.load(Ordering::Relaxed),
            choices_applied: self.choices_applied.load(Ordering::Relaxed),
            decay_passes: self.decay_passes.load(Ordering::Relaxed),
            assumptions_recorded: self.assumptions_recorded.load(Ordering::Relaxed),
            coerced_values: self.coerced_values.load(Ordering::Relaxed),
            propagated_writes: self.propagated_writes.load(Ordering::Relaxed),
            saves_completed: self.saves_completed.load(Ordering::Relaxed),
            saves_evicted: self.saves_evicted.load(Ordering::Relaxed),
            loads_completed: self.loads_completed.load(Ordering::Relaxed),
        }
    }
}

impl Default for SimCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    /// See [`SimCounters::actions_dispatched`].
    pub actions_dispatched: u64,
    /// See [`SimCounters::choices_applied`].
    pub choices_applied: u64,
    /// See [`SimCounters::decay_passes`].
    pub decay_passes: u64,
    /// See [`SimCounters::assumptions_recorded`].
    pub assumptions_recorded: u64,
    /// See [`SimCounters::coerced_values`].
    pub coerced_values: u64,
    /// See [`SimCounters::propagated_writes`].
    pub propagated_writes: u64,
    /// See [`SimCounters::saves_completed`].
    pub saves_completed: u64,
    /// See [`SimCounters::saves_evicted`].
    pub saves_evicted: u64,
    /// See [`SimCounters::loads_completed`].
    pub loads_completed: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows: [(&str, &str, u64); 9] = [
            ("actions_dispatched", "Actions passed to the reducer", self.actions_dispatched),
            ("choices_applied", "Choices applied", self.choices_applied),
            ("decay_passes", "Memory decay passes", self.decay_passes),
            ("assumptions_recorded", "Assumptions recorded", self.assumptions_recorded),
            ("coerced_values", "Non-finite delta values treated as zero", self.coerced_values),
            ("propagated_writes", "Regional spill-over writes", self.propagated_writes),
            ("saves_completed", "Save operations completed", self.saves_completed),
            ("saves_evicted", "Saves evicted at capacity", self.saves_evicted),
            ("loads_completed", "Load operations completed", self.loads_completed),
        ];
        let mut out = String::new();
        for (name, help, value) in rows {
            out.push_str(&format!(
                "# HELP govsim_{name}_total {help}\n\
                 # TYPE govsim_{name}_total counter\n\
                 govsim_{name}_total {value}\n"
            ));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Transition Monitor
// ---------------------------------------------------------------------------

const HISTORY_LEN: usize = 256;

/// Latency history for reducer transitions.
pub struct TransitionMonitor {
    slow_ms: f64,
    history: Mutex<History>,
}

struct History {
    timings: Vec<f64>,
    write_idx: usize,
    count: u64,
    slow: u64,
}

impl TransitionMonitor {
    /// Monitor that warns about transitions slower than `slow_ms`.
    #[must_use]
    pub fn new(slow_ms: f64) -> Self {
        Self {
            slow_ms,
            history: Mutex::new(History {
                timings: vec![0.0; HISTORY_LEN],
                write_idx: 0,
                count: 0,
                slow: 0,
            }),
        }
    }

    /// Start timing a transition; the guard records on drop.
    #[must_use]
    pub fn begin(&self, action: &'static str) -> TransitionGuard<'_> {
        TransitionGuard { monitor: self, action, start: Instant::now() }
    }

    /// Record a timing in milliseconds.
    pub fn record(&self, action: &str, ms: f64) {
        let mut h = self.history.lock();
        let idx = h.write_idx;
        h.timings[idx] = ms;
        h.write_idx = (idx + 1) % HISTORY_LEN;
        h.count += 1;
        if ms > self.slow_ms {
            h.slow += 1;
            drop(h);
            warn!(action, ms, threshold_ms = self.slow_ms, "slow transition");
        }
    }

    /// Transitions recorded.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.history.lock().count
    }

    /// Transitions that exceeded the threshold.
    #[must_use]
    pub fn slow_count(&self) -> u64 {
        self.history.lock().slow
    }

    /// P50/P95/max over the retained history.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn percentiles(&self) -> TransitionPercentiles {
        let h = self.history.lock();
        let n = usize::try_from(h.count).unwrap_or(usize::MAX).min(HISTORY_LEN);
        if n == 0 {
            return TransitionPercentiles::default();
        }
        let mut sorted = h.timings[..n].to_vec();
        sorted.sort_by(f64::total_cmp);
        TransitionPercentiles {
            p50: sorted[n / 2],
            p95: sorted[((n as f64 * 0.95) as usize).min(n - 1)],
            max: sorted[n - 1],
        }
    }
}

/// Records elapsed time when dropped.
pub struct TransitionGuard<'a> {
    monitor: &'a TransitionMonitor,
    action: &'static str,
    start: Instant,
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        let ms = self.start.elapsed().as_secs_f64() * 1000.0;
        self.monitor.record(self.action, ms);
    }
}

/// Percentile summary in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransitionPercentiles {
    /// Median.
    pub p50: f64,
    /// 95th percentile.
    pub p95: f64,
    /// Slowest retained.
    pub max: f64,
}

impl TransitionPercentiles {
    /// One-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("P50={:.3}ms  P95={:.3}ms  Max={:.3}ms", self.p50, self.p95, self.max)
    }
}

// ---------------------------------------------------------------------------
// Span Names
// ---------------------------------------------------------------------------

/// Span names used with `tracing::span!`.
pub mod spans {
    /// One reducer dispatch.
    pub const DISPATCH: &str = "govsim::dispatch";
    /// One pipeline stage inside `CHOOSE_OPTION`.
    pub const STAGE: &str = "govsim::stage";
    /// Save store write.
    pub const PERSIST_SAVE: &str = "govsim::persist::save";
    /// Save store read.
    pub const PERSIST_LOAD: &str = "govsim::persist::load";
    /// Host session choice.
    pub const SESSION_CHOOSE: &str = "govsim::session::choose";
    /// Action log replay.
    pub const REPLAY: &str = "govsim::replay";
}
