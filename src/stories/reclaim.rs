//! The single reclamation primitive shared by every expiry trigger.

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::StoryManager;
use crate::blob::BlobRef;
use crate::counters;
use crate::error::Result;
use crate::metrics;
use crate::model::{ContentType, ReclaimTrigger, Story, StoryTombstone, collections, fields};
use crate::reliability::retry_anyhow;
use crate::store::Filter;

pub(super) const CASCADE_PENDING: &str = "cascade_pending";

/// What one `reclaim` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclaimOutcome {
    /// This call removed the record.
    pub reclaimed: bool,
    /// Blob deletes that still failed after retrying; they were skipped.
    pub blob_failures: usize,
}

impl StoryManager {
    /// Reclaims a story: blobs, tombstone, record, then counters.
    ///
    /// Safe to call any number of times from any trigger. A missing record
    /// or missing blob counts as success, and only the call whose
    /// conditional delete removes the record starts the cascade
    /// (`stories_count` decrement and like purge).
    ///
    /// Blobs go first so a crash part-way leaves a record that a later
    /// trigger reclaims again, rather than blobs nothing points at. The
    /// tombstone stays `cascade_pending` until the cascade has been applied,
    /// so a cascade that errors is finished by the next sweep.
    pub async fn reclaim(&self, story_id: &str, trigger: ReclaimTrigger) -> Result<ReclaimOutcome> {
        let collection = ContentType::Story.collection();
        let story: Option<Story> = self.store.get(collection, story_id).await?;
        let Some(story) = story else {
            metrics::record_story_reclamation(trigger.as_str(), "already_reclaimed");
            debug!(story_id, trigger = %trigger, "Story already reclaimed");
            return Ok(ReclaimOutcome::default());
        };

        let deleted =
            join_all(story.blob_refs().map(|blob| self.delete_blob(blob, story_id))).await;
        let blob_failures = deleted.iter().filter(|ok| !**ok).count();

        let fresh = StoryTombstone::for_story(&story, self.clock.now(), trigger);
        let tombstone = if self
            .store
            .insert(collections::STORY_TOMBSTONES, story_id, &fresh)
            .await?
        {
            fresh
        } else {
            // Left by an earlier attempt that stopped before the delete
            self.store
                .get(collections::STORY_TOMBSTONES, story_id)
                .await?
                .unwrap_or(fresh)
        };

        let removed: Option<Story> = self.store.take(collection, story_id, None).await?;
        if removed.is_none() {
            metrics::record_story_reclamation(trigger.as_str(), "already_reclaimed");
            debug!(story_id, trigger = %trigger, "Lost reclamation race");
            return Ok(ReclaimOutcome {
                reclaimed: false,
                blob_failures,
            });
        }

        let purged = self.finish_cascade(&tombstone).await?;

        metrics::record_story_reclamation(trigger.as_str(), "reclaimed");
        info!(
            story_id,
            owner = %tombstone.owner_id,
            trigger = %trigger,
            blob_failures,
            likes_purged = purged,
            "Story reclaimed"
        );
        Ok(ReclaimOutcome {
            reclaimed: true,
            blob_failures,
        })
    }

    /// Completes the cascade recorded by a pending tombstone.
    ///
    /// A story record that still exists is reclaimed in full instead. Returns
    /// whether any cascade work was applied by this call.
    pub(super) async fn resume_cascade(&self, tombstone: &StoryTombstone) -> Result<bool> {
        if self
            .store
            .exists(ContentType::Story.collection(), &tombstone.id)
            .await?
        {
            return Ok(self.reclaim(&tombstone.id, tombstone.trigger).await?.reclaimed);
        }
        let purged = self.finish_cascade(tombstone).await?;
        info!(story_id = %tombstone.id, likes_purged = purged, "Resumed story cascade");
        Ok(true)
    }

    /// Purges the story's likes, then claims the pending flag and applies the
    /// `stories_count` decrement. Returns the number of likes purged.
    ///
    /// The purge is idempotent. The decrement is applied only by the caller
    /// whose compare-and-swap clears `cascade_pending`, so racing callers
    /// decrement once.
    async fn finish_cascade(&self, tombstone: &StoryTombstone) -> Result<u64> {
        let purged = self
            .ledger
            .purge_engagements(ContentType::Story, &tombstone.id)
            .await?;

        let settled = StoryTombstone {
            cascade_pending: false,
            ..tombstone.clone()
        };
        let claimed = self
            .store
            .replace_if(
                collections::STORY_TOMBSTONES,
                &tombstone.id,
                &Filter::eq(CASCADE_PENDING, true),
                &settled,
            )
            .await?;
        if claimed.is_none() {
            return Ok(purged);
        }

        let decremented =
            counters::adjust_profile(&self.store, &tombstone.owner_id, fields::STORIES_COUNT, -1)
                .await;
        if let Err(e) = decremented {
            let pending = StoryTombstone {
                cascade_pending: true,
                ..tombstone.clone()
            };
            let restored = self
                .store
                .replace_if(
                    collections::STORY_TOMBSTONES,
                    &tombstone.id,
                    &Filter::eq(CASCADE_PENDING, false),
                    &pending,
                )
                .await;
            if let Err(restore) = restored {
                warn!(
                    story_id = %tombstone.id,
                    error = %restore,
                    "Failed to re-mark story cascade pending, stories_count needs reconciliation"
                );
            }
            return Err(e);
        }
        Ok(purged)
    }

    /// Deletes a blob with bounded retry. Failure is logged and swallowed.
    async fn delete_blob(&self, blob: &BlobRef, story_id: &str) -> bool {
        let blobs = &self.blobs;
        let result = retry_anyhow(self.options.blob_retry.clone(), "blob_delete", || async move {
            blobs.delete(blob).await
        })
        .await;

        match result {
            Ok(_) => true,
            Err(e) => {
                metrics::record_blob_delete_failure();
                warn!(
                    story_id,
                    key = %blob,
                    error = %e,
                    "Blob delete failed, continuing reclamation"
                );
                false
            },
        }
    }
}
