//! Result types for ledger operations.

use std::collections::HashMap;

/// Structured outcome of a bulk like.
///
/// Every requested id lands in exactly one list, in the order it first
/// appeared in the request. Duplicate ids in the request are collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkLikeResult {
    pub newly_liked: Vec<String>,
    pub already_liked: Vec<String>,
    pub non_existent: Vec<String>,
    /// Resulting `likes_count` for each newly liked id.
    pub likes_counts: HashMap<String, i64>,
}

impl BulkLikeResult {
    /// Total number of distinct ids processed.
    pub fn total(&self) -> usize {
        self.newly_liked.len() + self.already_liked.len() + self.non_existent.len()
    }
}

/// A counter rewritten by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterCorrection {
    pub id: String,
    pub previous: i64,
    pub actual: i64,
}

/// Outcome of recomputing counters from their source records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scanned: u64,
    pub corrections: Vec<CounterCorrection>,
    /// Engagement records removed because their content no longer exists.
    pub orphans_purged: u64,
}

impl ReconcileReport {
    pub fn is_consistent(&self) -> bool {
        self.corrections.is_empty() && self.orphans_purged == 0
    }
}
