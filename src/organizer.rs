//! Read-only structural views over an outcome set
//!
//! - severity buckets (fixed four-slot table, iterated high to low)
//! - top issues (failing/warning outcomes, stable-sorted worst severity first)
//! - worst-first reordering (lowest score promoted to the front)
//!
//! Every view borrows from the input slice and never mutates it, so the
//! same input always yields the same view.

use crate::models::{CheckOutcome, Severity};
use std::cmp::Reverse;

/// Outcomes partitioned by severity, in encounter order within each bucket
#[derive(Debug, Clone, Default)]
pub struct SeverityBuckets<'a> {
    // Indexed by position in `Severity::ALL`
    buckets: [Vec<&'a CheckOutcome>; 4],
}

impl<'a> SeverityBuckets<'a> {
    fn slot(severity: Severity) -> usize {
        match severity {
            Severity::Low => 0,
            Severity::Medium => 1,
            Severity::High => 2,
            Severity::Critical => 3,
        }
    }

    /// Outcomes in the bucket for `severity`
    pub fn get(&self, severity: Severity) -> &[&'a CheckOutcome] {
        &self.buckets[Self::slot(severity)]
    }

    /// Non-empty buckets from the highest severity to the lowest
    pub fn iter_high_to_low(&self) -> impl Iterator<Item = (Severity, &[&'a CheckOutcome])> + '_ {
        Severity::ALL
            .iter()
            .rev()
            .map(|s| (*s, self.get(*s)))
            .filter(|(_, bucket)| !bucket.is_empty())
    }

    /// Total outcomes across all buckets
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bucket outcomes by their own severity
pub fn group_by_severity(outcomes: &[CheckOutcome]) -> SeverityBuckets<'_> {
    let mut grouped = SeverityBuckets::default();
    for outcome in outcomes {
        grouped.buckets[SeverityBuckets::slot(outcome.severity())].push(outcome);
    }
    grouped
}

/// Failing and warning outcomes, worst severity first
///
/// Ties keep encounter order (`sort_by_key` is stable).
pub fn rank_top_issues(outcomes: &[CheckOutcome]) -> Vec<&CheckOutcome> {
    let mut issues: Vec<&CheckOutcome> = outcomes
        .iter()
        .filter(|o| o.status().is_issue())
        .collect();
    issues.sort_by_key(|o| Reverse(o.severity()));
    issues
}

/// The input order with the lowest-scoring outcome moved to the front
///
/// On a tie the first lowest outcome wins. Everything else keeps its
/// relative order.
pub fn reorder_worst_first(outcomes: &[CheckOutcome]) -> Vec<&CheckOutcome> {
    let mut reordered: Vec<&CheckOutcome> = outcomes.iter().collect();
    let worst = outcomes
        .iter()
        .enumerate()
        .min_by_key(|(i, o)| (o.score(), *i))
        .map(|(i, _)| i);
    if let Some(index) = worst {
        let item = reordered.remove(index);
        reordered.insert(0, item);
    }
    reordered
}
