//! Batch reclamation of expired stories.

use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

use super::StoryManager;
use super::reclaim::CASCADE_PENDING;
use crate::error::Result;
use crate::model::{ContentType, ReclaimTrigger, Story, StoryTombstone, collections};
use crate::store::{Filter, Order, Query};

/// Summary of one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired stories examined.
    pub scanned: usize,
    /// Stories this sweep removed.
    pub reclaimed: usize,
    /// Stories another trigger removed first.
    pub already_reclaimed: usize,
    /// Stories whose reclamation errored; they are retried next sweep.
    pub failed: usize,
    /// Blob deletes that were skipped after retries.
    pub blob_failures: usize,
    /// Cascades left pending by an earlier reclamation and finished here.
    pub cascades_resumed: usize,
    /// Tombstones older than the retention period that were removed.
    pub tombstones_purged: usize,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned={} reclaimed={} already_reclaimed={} failed={} blob_failures={} \
             cascades_resumed={} tombstones_purged={}",
            self.scanned,
            self.reclaimed,
            self.already_reclaimed,
            self.failed,
            self.blob_failures,
            self.cascades_resumed,
            self.tombstones_purged
        )
    }
}

impl StoryManager {
    /// Reclaims every story whose expiry has passed, finishes cascades left
    /// pending by failed reclamations, then purges old tombstones.
    ///
    /// Assumes no exclusive access: request-path reclamation may run at the
    /// same time, and those stories are reported as already reclaimed.
    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let expired = Filter::lte("expires_at", now.timestamp_millis());
        let batch_size = self.options.sweep_batch_size.max(1);
        let mut report = SweepReport::default();
        let mut failed_ids: HashSet<String> = HashSet::new();

        // Stories that failed may or may not still be in the result set, so
        // over-fetch by the failure count and drop them by id.
        loop {
            let query = Query::new(expired.clone())
                .sort("expires_at", Order::Asc)
                .limit(batch_size + failed_ids.len());
            let found: Vec<Story> = self
                .store
                .find(ContentType::Story.collection(), &query)
                .await?;
            let batch: Vec<Story> = found
                .into_iter()
                .filter(|story| !failed_ids.contains(&story.id))
                .take(batch_size)
                .collect();
            if batch.is_empty() {
                break;
            }

            for story in batch {
                report.scanned += 1;
                match self.reclaim(&story.id, ReclaimTrigger::Sweep).await {
                    Ok(outcome) => {
                        report.blob_failures += outcome.blob_failures;
                        if outcome.reclaimed {
                            report.reclaimed += 1;
                        } else {
                            report.already_reclaimed += 1;
                        }
                    },
                    Err(e) => {
                        report.failed += 1;
                        warn!(story_id = %story.id, error = %e, "Sweep failed to reclaim story");
                        failed_ids.insert(story.id);
                    },
                }
            }
        }

        let pending: Vec<StoryTombstone> = self
            .store
            .find(
                collections::STORY_TOMBSTONES,
                &Query::new(Filter::eq(CASCADE_PENDING, true)),
            )
            .await?;
        for tombstone in pending {
            if failed_ids.contains(&tombstone.id) {
                continue;
            }
            match self.resume_cascade(&tombstone).await {
                Ok(true) => report.cascades_resumed += 1,
                Ok(false) => {},
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        story_id = %tombstone.id,
                        error = %e,
                        "Sweep failed to resume story cascade"
                    );
                },
            }
        }

        report.tombstones_purged = self.purge_tombstones(now).await?;

        info!(
            scanned = report.scanned,
            reclaimed = report.reclaimed,
            already_reclaimed = report.already_reclaimed,
            failed = report.failed,
            blob_failures = report.blob_failures,
            cascades_resumed = report.cascades_resumed,
            tombstones_purged = report.tombstones_purged,
            "Story sweep finished"
        );
        Ok(report)
    }

    async fn purge_tombstones(&self, now: chrono::DateTime<chrono::Utc>) -> Result<usize> {
        let cutoff = now - self.options.tombstone_retention;
        let stale: Vec<StoryTombstone> = self
            .store
            .find(
                collections::STORY_TOMBSTONES,
                &Query::new(
                    Filter::lt("reclaimed_at", cutoff.timestamp_millis())
                        .and(Filter::eq(CASCADE_PENDING, false)),
                ),
            )
            .await?;

        // A cascade may go back to pending between the find and the delete
        let settled = Filter::eq(CASCADE_PENDING, false);
        let mut purged = 0;
        for tombstone in stale {
            if self
                .store
                .take::<StoryTombstone>(
                    collections::STORY_TOMBSTONES,
                    &tombstone.id,
                    Some(&settled),
                )
                .await?
                .is_some()
            {
                purged += 1;
            }
        }
        Ok(purged)
    }
}
