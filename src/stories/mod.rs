//! Ephemeral Content Manager for 24-hour stories.
//!
//! Three triggers race to retire an expired story, and all of them funnel
//! into [`StoryManager::reclaim`]:
//!
//! 1. **Passive filter**: every listing and count excludes
//!    `expires_at <= now`, so expired stories are invisible at once.
//! 2. **Read-triggered**: [`StoryManager::get_story`] on an expired story
//!    reclaims it synchronously and answers `Gone`.
//! 3. **Batch**: [`StoryManager::sweep_expired`], run by the sweeper,
//!    reclaims everything past expiry.
//!
//! Reclamation deletes blobs best-effort, writes a tombstone, then removes
//! the record with the store's conditional delete. Only the caller whose
//! delete actually removed the record starts the cascade: it purges the
//! story's likes and decrements `stories_count`. The tombstone carries a
//! `cascade_pending` flag until the cascade is applied, and the sweep
//! finishes any cascade a failed trigger left behind.

mod reclaim;
mod sweep;


pub use reclaim::ReclaimOutcome;
pub use sweep::SweepReport;

use chrono::TimeDelta;
use std::sync::Arc;
use tracing::{info, warn};

use crate::blob::{BlobRef, BlobStore};
use crate::clock::Clock;
use crate::constants::{
    DEFAULT_SWEEP_BATCH_SIZE, DEFAULT_TOMBSTONE_RETENTION_HOURS, STORY_BLOB_NAMESPACE,
};
use crate::counters;
use crate::error::{Error, Result, validate_id};
use crate::ledger::CounterLedger;
use crate::model::{ContentType, ReclaimTrigger, Story, StoryTombstone, collections, fields};
use crate::reliability::RetryConfig;
use crate::store::{DocumentStore, Filter, Order, Query};

const STORY: &str = "story";

/// Tunables for the story manager.
#[derive(Debug, Clone)]
pub struct StoryOptions {
    /// How long tombstones keep answering `Gone` before the sweep purges them.
    pub tombstone_retention: TimeDelta,
    /// Expired stories reclaimed per sweep query.
    pub sweep_batch_size: usize,
    /// Backoff for best-effort blob deletes.
    pub blob_retry: RetryConfig,
}

impl Default for StoryOptions {
    fn default() -> Self {
        Self {
            tombstone_retention: TimeDelta::hours(DEFAULT_TOMBSTONE_RETENTION_HOURS as i64),
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
            blob_retry: RetryConfig::quick(),
        }
    }
}

/// Media for a new story.
#[derive(Debug, Clone)]
pub struct NewStory {
    pub media: Vec<u8>,
    /// MIME type of `media`, e.g. `image/jpeg` or `video/mp4`.
    pub media_type: String,
    pub thumbnail: Option<Vec<u8>>,
}

/// Story operations over a document store and a blob store.
#[derive(Clone)]
pub struct StoryManager {
    store: DocumentStore,
    blobs: BlobStore,
    ledger: CounterLedger,
    clock: Arc<dyn Clock>,
    options: StoryOptions,
}

impl StoryManager {
    pub fn new(
        store: DocumentStore,
        blobs: BlobStore,
        ledger: CounterLedger,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            blobs,
            ledger,
            clock,
            options: StoryOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: StoryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &StoryOptions {
        &self.options
    }

    /// Uploads the media and persists a new story expiring in 24 hours.
    ///
    /// Blob uploads happen first; if any fails, blobs already uploaded are
    /// deleted best-effort and no record is written.
    ///
    /// # Errors
    ///
    /// - `Validation` for an invalid owner id or empty media
    /// - `BlobUpload` if storing the media or thumbnail fails
    pub async fn publish_story(&self, owner_id: &str, new_story: NewStory) -> Result<Story> {
        validate_id("owner", owner_id)?;
        if new_story.media.is_empty() {
            return Err(Error::validation("story media cannot be empty"));
        }
        if new_story.media_type.trim().is_empty() {
            return Err(Error::validation("story media type cannot be empty"));
        }

        let media_ref = self
            .blobs
            .put(STORY_BLOB_NAMESPACE, &new_story.media, Some(&new_story.media_type))
            .await
            .map_err(|e| Error::BlobUpload {
                reason: format!("{e:#}"),
            })?;

        let thumbnail_ref = match &new_story.thumbnail {
            Some(thumbnail) => match self.blobs.put(STORY_BLOB_NAMESPACE, thumbnail, None).await {
                Ok(blob) => Some(blob),
                Err(e) => {
                    self.discard_uploads(&[&media_ref]).await;
                    return Err(Error::BlobUpload {
                        reason: format!("{e:#}"),
                    });
                },
            },
            None => None,
        };

        let published_at = self.clock.now();
        let story = Story {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            media_ref,
            thumbnail_ref,
            media_type: new_story.media_type,
            published_at,
            expires_at: Story::expiry_for(published_at),
            views_count: 0,
            likes_count: 0,
        };

        let persisted = self
            .store
            .insert(ContentType::Story.collection(), &story.id, &story)
            .await;
        match persisted {
            Ok(true) => {},
            Ok(false) => {
                let uploaded: Vec<&BlobRef> = story.blob_refs().collect();
                self.discard_uploads(&uploaded).await;
                return Err(Error::Storage(anyhow::anyhow!(
                    "story id collision: {}",
                    story.id
                )));
            },
            Err(e) => {
                let uploaded: Vec<&BlobRef> = story.blob_refs().collect();
                self.discard_uploads(&uploaded).await;
                return Err(e.into());
            },
        }

        counters::adjust_profile(&self.store, owner_id, fields::STORIES_COUNT, 1).await?;

        info!(
            owner = owner_id,
            story_id = %story.id,
            expires_at = %story.expires_at,
            "Story published"
        );
        Ok(story)
    }

    /// Fetches a story by id.
    ///
    /// An expired story is reclaimed before answering.
    ///
    /// # Errors
    ///
    /// - `Gone` if the story expired or was reclaimed
    /// - `NotFound` if no such story ever existed (or its tombstone was purged)
    pub async fn get_story(&self, story_id: &str) -> Result<Story> {
        let story: Option<Story> = self
            .store
            .get(ContentType::Story.collection(), story_id)
            .await?;

        match story {
            Some(story) if story.is_live(self.clock.now()) => Ok(story),
            Some(story) => {
                self.reclaim(&story.id, ReclaimTrigger::Read).await?;
                Err(Error::gone(STORY, story_id))
            },
            None => Err(self.missing(story_id).await?),
        }
    }

    /// Counts a view on a live story and returns the new `views_count`.
    ///
    /// Views never extend `expires_at`.
    pub async fn record_view(&self, viewer_id: &str, story_id: &str) -> Result<i64> {
        validate_id("viewer", viewer_id)?;
        let story = self.get_story(story_id).await?;

        counters::adjust(
            &self.store,
            ContentType::Story.collection(),
            &story.id,
            fields::VIEWS_COUNT,
            1,
        )
        .await?
        .ok_or_else(|| Error::gone(STORY, story_id))
    }

    /// Live stories of an owner, newest first.
    pub async fn list_live_stories(&self, owner_id: &str) -> Result<Vec<Story>> {
        let query = Query::new(self.live_filter(owner_id)).sort("published_at", Order::Desc);
        Ok(self
            .store
            .find(ContentType::Story.collection(), &query)
            .await?)
    }

    /// Number of live stories of an owner.
    pub async fn count_live_stories(&self, owner_id: &str) -> Result<u64> {
        Ok(self
            .store
            .count(ContentType::Story.collection(), &self.live_filter(owner_id))
            .await?)
    }

    /// Deletes a story early on behalf of its owner.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if `actor_id` does not own the story
    /// - `Gone` / `NotFound` as for [`get_story`](Self::get_story)
    pub async fn delete_story(&self, actor_id: &str, story_id: &str) -> Result<ReclaimOutcome> {
        let story: Option<Story> = self
            .store
            .get(ContentType::Story.collection(), story_id)
            .await?;
        let Some(story) = story else {
            return Err(self.missing(story_id).await?);
        };
        if story.owner_id != actor_id {
            return Err(Error::forbidden(actor_id, format!("delete story '{story_id}'")));
        }

        let outcome = self.reclaim(&story.id, ReclaimTrigger::Owner).await?;
        if !outcome.reclaimed {
            return Err(Error::gone(STORY, story_id));
        }
        Ok(outcome)
    }

    /// Recomputes an owner's `stories_count` from story records, counting
    /// reclaimed stories whose decrement is still pending as present.
    ///
    /// Returns the previous value when a correction was written.
    pub async fn reconcile_stories_count(&self, owner_id: &str) -> Result<Option<i64>> {
        validate_id("owner", owner_id)?;
        let collection = ContentType::Story.collection();
        let mut actual = self
            .store
            .count(collection, &Filter::eq("owner_id", owner_id))
            .await?;

        let pending: Vec<StoryTombstone> = self
            .store
            .find(
                collections::STORY_TOMBSTONES,
                &Query::new(
                    Filter::eq("owner_id", owner_id)
                        .and(Filter::eq(reclaim::CASCADE_PENDING, true)),
                ),
            )
            .await?;
        for tombstone in pending {
            if !self.store.exists(collection, &tombstone.id).await? {
                actual += 1;
            }
        }

        let actual = actual as i64;
        let previous = counters::set_counter(
            &self.store,
            collections::PROFILES,
            owner_id,
            fields::STORIES_COUNT,
            actual,
        )
        .await?;
        if let Some(previous) = previous {
            info!(owner = owner_id, previous, actual, "Corrected drifted stories_count");
        }
        Ok(previous)
    }

    /// `Gone` if a tombstone remembers the story, `NotFound` otherwise.
    async fn missing(&self, story_id: &str) -> Result<Error> {
        let tombstone: Option<StoryTombstone> = self
            .store
            .get(collections::STORY_TOMBSTONES, story_id)
            .await?;
        Ok(match tombstone {
            Some(_) => Error::gone(STORY, story_id),
            None => Error::not_found(STORY, story_id),
        })
    }

    fn live_filter(&self, owner_id: &str) -> Filter {
        let now_ms = self.clock.now().timestamp_millis();
        Filter::eq("owner_id", owner_id).and(Filter::gt("expires_at", now_ms))
    }

    /// Best-effort cleanup of blobs uploaded by a publish that failed.
    async fn discard_uploads(&self, uploaded: &[&BlobRef]) {
        for blob in uploaded {
            if let Err(e) = self.blobs.delete(blob).await {
                warn!(key = %blob, error = %e, "Failed to discard blob from aborted publish");
            }
        }
    }
}
