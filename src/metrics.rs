//! Metric names and recording helpers.
//!
//! Recording goes through the `metrics` facade; nothing is exported unless
//! a recorder is installed (see the `scheduler` command).

use ::metrics::{counter, describe_counter};

pub const ENGAGEMENT_OPERATIONS_TOTAL: &str = "plaza_engagement_operations_total";
pub const FOLLOW_TRANSITIONS_TOTAL: &str = "plaza_follow_transitions_total";
pub const STORY_RECLAMATIONS_TOTAL: &str = "plaza_story_reclamations_total";
pub const COUNTER_UNDERFLOWS_TOTAL: &str = "plaza_counter_underflows_total";
pub const BLOB_DELETE_FAILURES_TOTAL: &str = "plaza_blob_delete_failures_total";

/// Registers descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(
        ENGAGEMENT_OPERATIONS_TOTAL,
        "Like, unlike and bulk-like operations by content type"
    );
    describe_counter!(
        FOLLOW_TRANSITIONS_TOTAL,
        "Follow edge transitions applied"
    );
    describe_counter!(
        STORY_RECLAMATIONS_TOTAL,
        "Story reclamation attempts by trigger and outcome"
    );
    describe_counter!(
        COUNTER_UNDERFLOWS_TOTAL,
        "Decrements clamped at zero"
    );
    describe_counter!(
        BLOB_DELETE_FAILURES_TOTAL,
        "Blob deletes that failed after retries and were swallowed"
    );
}

pub fn record_engagement_operation(operation: &'static str, content_type: &'static str) {
    counter!(
        ENGAGEMENT_OPERATIONS_TOTAL,
        "operation" => operation,
        "content_type" => content_type
    )
    .increment(1);
}

pub fn record_follow_transition(transition: &'static str) {
    counter!(FOLLOW_TRANSITIONS_TOTAL, "transition" => transition).increment(1);
}

/// `outcome` is `reclaimed` when this call removed the record, `already_reclaimed` otherwise.
pub fn record_story_reclamation(trigger: &'static str, outcome: &'static str) {
    counter!(
        STORY_RECLAMATIONS_TOTAL,
        "trigger" => trigger,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_counter_underflow(field: &str) {
    counter!(COUNTER_UNDERFLOWS_TOTAL, "field" => field.to_string()).increment(1);
}

pub fn record_blob_delete_failure() {
    counter!(BLOB_DELETE_FAILURES_TOTAL).increment(1);
}
