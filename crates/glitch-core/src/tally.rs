//! Per-run outcome counters and throughput.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::Outcome;

/// Running count of outcomes seen during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OutcomeTally {
    counts: BTreeMap<Outcome, u64>,
}

impl OutcomeTally {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more trial with `outcome`.
    pub fn record(&mut self, outcome: Outcome) {
        *self.counts.entry(outcome).or_insert(0) += 1;
    }

    /// Number of trials classified as `outcome`.
    pub fn count(&self, outcome: Outcome) -> u64 {
        self.counts.get(&outcome).copied().unwrap_or(0)
    }

    /// Total trials counted.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Iterates `(outcome, count)` over every outcome, including zero counts.
    pub fn iter(&self) -> impl Iterator<Item = (Outcome, u64)> + '_ {
        Outcome::ALL
            .iter()
            .map(move |outcome| (*outcome, self.count(*outcome)))
    }
}

impl FromIterator<Outcome> for OutcomeTally {
    fn from_iter<T: IntoIterator<Item = Outcome>>(iter: T) -> Self {
        let mut tally = Self::new();
        for outcome in iter {
            tally.record(outcome);
        }
        tally
    }
}

/// Trials per second since `start_epoch_s`, or `None` before a full second has passed.
pub fn throughput(start_epoch_s: i64, now_epoch_s: i64, trials: u64) -> Option<u64> {
    let elapsed = now_epoch_s.saturating_sub(start_epoch_s);
    if elapsed <= 0 {
        None
    } else {
        Some(trials / elapsed as u64)
    }
}
