//! Execution-time statistics.
//!
//! Evaluators record how long each category of call takes. The category names
//! are shared with the least-squares evaluator so that a single reporting path
//! can aggregate both.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Accumulated time and call count for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallStatistics {
    /// Total wall time spent in the category.
    pub time: Duration,
    /// Number of recorded calls.
    pub calls: usize,
}

/// Per-category call statistics.
///
/// Recording takes `&self` so that timers can nest.
#[derive(Debug, Default)]
pub struct ExecutionSummary {
    statistics: Mutex<BTreeMap<String, CallStatistics>>,
}

impl ExecutionSummary {
    /// Creates an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one call of `duration` to `name`.
    pub fn increment_call(&self, name: &str, duration: Duration) {
        let mut statistics = self.statistics.lock();
        let entry = statistics.entry(name.to_owned()).or_default();
        entry.time += duration;
        entry.calls += 1;
    }

    /// Snapshot of all categories.
    pub fn statistics(&self) -> BTreeMap<String, CallStatistics> {
        self.statistics.lock().clone()
    }

    /// Clears all categories.
    pub fn clear(&self) {
        self.statistics.lock().clear();
    }
}

/// A timer guard that records its lifetime into an [`ExecutionSummary`] on drop.
pub struct ScopedExecutionTimer<'a> {
    name: &'static str,
    summary: &'a ExecutionSummary,
    start: Instant,
}

impl<'a> ScopedExecutionTimer<'a> {
    /// Starts timing `name`.
    pub fn new(name: &'static str, summary: &'a ExecutionSummary) -> Self {
        Self {
            name,
            summary,
            start: Instant::now(),
        }
    }
}

impl Drop for ScopedExecutionTimer<'_> {
    fn drop(&mut self) {
        self.summary.increment_call(self.name, self.start.elapsed());
    }
}
