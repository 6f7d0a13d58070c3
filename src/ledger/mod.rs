//! Counter Ledger: idempotent engagement records and `likes_count`.
//!
//! The ledger is the single authority for `likes_count` on every
//! engageable collection. Each active like is one [`EngagementRecord`] whose
//! id is the compound ledger key, so the store's insert-if-absent is the
//! real guard against duplicate likes. The counter is maintained as an
//! eventually-consistent cache of the record count:
//!
//! - like: insert record, then `+1`
//! - unlike: conditional delete of the record, then floor-clamped `-1`
//! - bulk like: one existence query, one already-liked query, inserts for
//!   the remainder, one batched increment
//!
//! [`CounterLedger::reconcile`] recomputes counters from the records when
//! drift needs repairing.

mod types;


pub use types::{BulkLikeResult, CounterCorrection, ReconcileReport};

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::constants::MAX_BULK_LIKE;
use crate::counters;
use crate::error::{Error, Result, validate_id};
use crate::metrics;
use crate::model::{ContentType, EngagementRecord, Page, collections, fields};
use crate::store::{DocumentStore, Filter, Order, Query};

/// Items scanned per page during reconciliation.
const RECONCILE_PAGE: usize = 500;

/// Engagement ledger over a document store.
#[derive(Clone)]
pub struct CounterLedger {
    store: DocumentStore,
    clock: Arc<dyn Clock>,
    bulk_like_limit: usize,
}

impl CounterLedger {
    pub fn new(store: DocumentStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            bulk_like_limit: MAX_BULK_LIKE,
        }
    }

    /// Lowers the bulk-like cap. Values outside `1..=MAX_BULK_LIKE` are clamped.
    #[must_use]
    pub fn with_bulk_like_limit(mut self, limit: usize) -> Self {
        self.bulk_like_limit = limit.clamp(1, MAX_BULK_LIKE);
        self
    }

    pub fn bulk_like_limit(&self) -> usize {
        self.bulk_like_limit
    }

    /// Records a like and returns the resulting `likes_count`.
    ///
    /// # Errors
    ///
    /// - `ContentNotFound` if the target does not exist or is an expired story
    /// - `AlreadyLiked` if the actor already likes the target
    pub async fn like(
        &self,
        actor_id: &str,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<i64> {
        validate_id("actor", actor_id)?;
        validate_id("content", content_id)?;

        if self.live_content(content_type, content_id).await?.is_none() {
            return Err(Error::ContentNotFound {
                content_type,
                id: content_id.to_string(),
            });
        }

        let record = EngagementRecord {
            actor_id: actor_id.to_string(),
            content_type,
            content_id: content_id.to_string(),
            created_at: self.clock.now(),
        };
        let key = record.id();
        if !self
            .store
            .insert(collections::ENGAGEMENTS, &key, &record)
            .await?
        {
            return Err(Error::AlreadyLiked {
                actor: actor_id.to_string(),
                content_type,
                id: content_id.to_string(),
            });
        }

        let Some(likes) = counters::adjust(
            &self.store,
            content_type.collection(),
            content_id,
            fields::LIKES_COUNT,
            1,
        )
        .await?
        else {
            // Content deleted between the existence check and the increment
            self.store
                .take::<EngagementRecord>(collections::ENGAGEMENTS, &key, None)
                .await?;
            return Err(Error::ContentNotFound {
                content_type,
                id: content_id.to_string(),
            });
        };

        metrics::record_engagement_operation("like", content_type.as_str());
        debug!(actor = actor_id, content_type = %content_type, content_id, likes, "Liked");
        Ok(likes)
    }

    /// Removes a like and returns the resulting `likes_count`.
    ///
    /// Returns `0` if the content itself no longer exists.
    ///
    /// # Errors
    ///
    /// - `NotLiked` if the actor has no active like on the target
    pub async fn unlike(
        &self,
        actor_id: &str,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<i64> {
        validate_id("actor", actor_id)?;
        validate_id("content", content_id)?;

        let key = EngagementRecord::key(actor_id, content_type, content_id);
        let removed: Option<EngagementRecord> =
            self.store.take(collections::ENGAGEMENTS, &key, None).await?;
        if removed.is_none() {
            return Err(Error::NotLiked {
                actor: actor_id.to_string(),
                content_type,
                id: content_id.to_string(),
            });
        }

        let likes = counters::adjust(
            &self.store,
            content_type.collection(),
            content_id,
            fields::LIKES_COUNT,
            -1,
        )
        .await?
        .unwrap_or(0);

        metrics::record_engagement_operation("unlike", content_type.as_str());
        debug!(actor = actor_id, content_type = %content_type, content_id, likes, "Unliked");
        Ok(likes)
    }

    /// Likes many items of one content type, reporting partial outcomes.
    ///
    /// Malformed ids are reported as non-existent rather than failing the batch.
    ///
    /// # Errors
    ///
    /// - `BatchTooLarge` if more ids than the configured limit are supplied
    pub async fn bulk_like(
        &self,
        actor_id: &str,
        content_type: ContentType,
        content_ids: &[String],
    ) -> Result<BulkLikeResult> {
        validate_id("actor", actor_id)?;
        if content_ids.len() > self.bulk_like_limit {
            return Err(Error::BatchTooLarge {
                size: content_ids.len(),
                max: self.bulk_like_limit,
            });
        }

        let mut seen = HashSet::new();
        let requested: Vec<&str> = content_ids
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect();
        let candidates: Vec<&str> = requested
            .iter()
            .copied()
            .filter(|id| validate_id("content", id).is_ok())
            .collect();

        // Partition 1: exists / does not exist
        let existing = self.live_ids(content_type, &candidates).await?;

        // Partition 2: already liked / not yet liked
        let liked: HashSet<String> = if existing.is_empty() {
            HashSet::new()
        } else {
            let filter = Filter::eq("actor_id", actor_id)
                .and(Filter::eq("content_type", content_type.as_str()))
                .and(Filter::is_in("content_id", existing.iter().cloned()));
            self.store
                .find::<EngagementRecord>(collections::ENGAGEMENTS, &Query::new(filter))
                .await?
                .into_iter()
                .map(|record| record.content_id)
                .collect()
        };

        let now = self.clock.now();
        let mut inserted = Vec::new();
        let mut raced = HashSet::new();
        for id in requested.iter().filter(|id| existing.contains(**id) && !liked.contains(**id)) {
            let record = EngagementRecord {
                actor_id: actor_id.to_string(),
                content_type,
                content_id: (*id).to_string(),
                created_at: now,
            };
            if self
                .store
                .insert(collections::ENGAGEMENTS, &record.id(), &record)
                .await?
            {
                inserted.push((*id).to_string());
            } else {
                raced.insert(*id);
            }
        }

        let likes_counts: HashMap<String, i64> = counters::adjust_many(
            &self.store,
            content_type.collection(),
            &inserted,
            fields::LIKES_COUNT,
            1,
        )
        .await?
        .into_iter()
        .collect();

        // Items deleted mid-batch got a record but no counter; undo the record
        let mut vanished = HashSet::new();
        for id in inserted.iter().filter(|id| !likes_counts.contains_key(*id)) {
            let key = EngagementRecord::key(actor_id, content_type, id);
            self.store
                .take::<EngagementRecord>(collections::ENGAGEMENTS, &key, None)
                .await?;
            vanished.insert(id.as_str());
        }

        let mut result = BulkLikeResult {
            likes_counts,
            ..BulkLikeResult::default()
        };
        for id in requested {
            if !existing.contains(id) || vanished.contains(id) {
                result.non_existent.push(id.to_string());
            } else if liked.contains(id) || raced.contains(id) {
                result.already_liked.push(id.to_string());
            } else {
                result.newly_liked.push(id.to_string());
            }
        }

        metrics::record_engagement_operation("bulk_like", content_type.as_str());
        info!(
            actor = actor_id,
            content_type = %content_type,
            newly_liked = result.newly_liked.len(),
            already_liked = result.already_liked.len(),
            non_existent = result.non_existent.len(),
            "Bulk like processed"
        );
        Ok(result)
    }

    /// Whether the actor currently likes the item.
    pub async fn has_liked(
        &self,
        actor_id: &str,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<bool> {
        let key = EngagementRecord::key(actor_id, content_type, content_id);
        Ok(self.store.exists(collections::ENGAGEMENTS, &key).await?)
    }

    /// Engagement records for an item, newest first.
    pub async fn likers(
        &self,
        content_type: ContentType,
        content_id: &str,
        page: Page,
    ) -> Result<Vec<EngagementRecord>> {
        let query = Query::new(engagements_of(content_type, content_id))
            .sort("created_at", Order::Desc)
            .skip(page.skip)
            .limit(page.limit);
        Ok(self.store.find(collections::ENGAGEMENTS, &query).await?)
    }

    /// Deletes a content item on behalf of its owner and cascades to its
    /// engagement records. Returns the number of records purged.
    ///
    /// Stories are deleted through the story manager, which also reclaims
    /// their media.
    ///
    /// If the purge fails after the item is gone, the remaining records are
    /// removed by the next [`reconcile`](Self::reconcile) of that type.
    ///
    /// # Errors
    ///
    /// - `Validation` for stories
    /// - `ContentNotFound` if the item does not exist
    /// - `Forbidden` if `actor_id` does not own the item
    pub async fn remove_content(
        &self,
        actor_id: &str,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<u64> {
        if content_type == ContentType::Story {
            return Err(Error::validation(
                "stories are deleted through the story manager",
            ));
        }
        let not_found = || Error::ContentNotFound {
            content_type,
            id: content_id.to_string(),
        };

        let doc = self
            .store
            .get_raw(content_type.collection(), content_id)
            .await?
            .ok_or_else(not_found)?;
        if doc.get("owner_id").and_then(Value::as_str) != Some(actor_id) {
            return Err(Error::forbidden(
                actor_id,
                format!("delete {content_type} '{content_id}'"),
            ));
        }

        if self
            .store
            .take::<Value>(content_type.collection(), content_id, None)
            .await?
            .is_none()
        {
            return Err(not_found());
        }

        let purged = self.purge_engagements(content_type, content_id).await?;
        info!(
            actor = actor_id,
            content_type = %content_type,
            content_id,
            purged,
            "Content removed"
        );
        Ok(purged)
    }

    /// Deletes every engagement record referencing an item.
    ///
    /// Idempotent; returns how many records this call removed.
    pub async fn purge_engagements(
        &self,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<u64> {
        let records: Vec<EngagementRecord> = self
            .store
            .find(
                collections::ENGAGEMENTS,
                &Query::new(engagements_of(content_type, content_id)),
            )
            .await?;

        let mut purged = 0;
        for record in records {
            if self
                .store
                .take::<EngagementRecord>(collections::ENGAGEMENTS, &record.id(), None)
                .await?
                .is_some()
            {
                purged += 1;
            }
        }
        if purged > 0 {
            debug!(content_type = %content_type, content_id, purged, "Purged engagement records");
        }
        Ok(purged)
    }

    /// Recomputes `likes_count` for every item of a content type from the
    /// ledger and rewrites the counters that drifted.
    pub async fn reconcile(&self, content_type: ContentType) -> Result<ReconcileReport> {
        let records: Vec<EngagementRecord> = self
            .store
            .find(
                collections::ENGAGEMENTS,
                &Query::new(Filter::eq("content_type", content_type.as_str())),
            )
            .await?;
        let mut actual: HashMap<String, i64> = HashMap::new();
        for record in records {
            *actual.entry(record.content_id).or_default() += 1;
        }

        let collection = content_type.collection();
        let mut report = ReconcileReport::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut skip = 0;
        loop {
            let query = Query::all()
                .sort("id", Order::Asc)
                .skip(skip)
                .limit(RECONCILE_PAGE);
            let page = self.store.find::<Value>(collection, &query).await?;
            if page.is_empty() {
                break;
            }
            skip += page.len();

            for doc in page {
                let Some(id) = doc.get("id").and_then(Value::as_str) else {
                    warn!(collection, "Skipping content document without id");
                    continue;
                };
                report.scanned += 1;
                seen.insert(id.to_string());
                let expected = actual.get(id).copied().unwrap_or(0);
                let corrected = counters::set_counter(
                    &self.store,
                    collection,
                    id,
                    fields::LIKES_COUNT,
                    expected,
                )
                .await?;
                if let Some(previous) = corrected {
                    warn!(
                        content_type = %content_type,
                        content_id = id,
                        previous,
                        actual = expected,
                        "Corrected drifted likes_count"
                    );
                    report.corrections.push(CounterCorrection {
                        id: id.to_string(),
                        previous,
                        actual: expected,
                    });
                }
            }
        }

        // Records left behind by a removal whose purge never completed.
        // Paging can miss a document deleted mid-scan, so each orphan is
        // confirmed before its records go.
        for content_id in actual.keys().filter(|id| !seen.contains(*id)) {
            if self.store.exists(collection, content_id).await? {
                continue;
            }
            let purged = self.purge_engagements(content_type, content_id).await?;
            if purged > 0 {
                warn!(
                    content_type = %content_type,
                    content_id = %content_id,
                    purged,
                    "Purged engagement records of missing content"
                );
            }
            report.orphans_purged += purged;
        }

        info!(
            content_type = %content_type,
            scanned = report.scanned,
            corrected = report.corrections.len(),
            orphans_purged = report.orphans_purged,
            "Ledger reconciliation finished"
        );
        Ok(report)
    }

    /// Loads an engageable item, hiding expired ones.
    async fn live_content(
        &self,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<Option<Value>> {
        let doc = self
            .store
            .get_raw(content_type.collection(), content_id)
            .await?;
        let now_ms = self.clock.now().timestamp_millis();
        Ok(doc.filter(|doc| is_live(doc, now_ms)))
    }

    /// Ids among `ids` that exist and are live, in one query.
    async fn live_ids(&self, content_type: ContentType, ids: &[&str]) -> Result<HashSet<String>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let query = Query::new(Filter::is_in("id", ids.iter().copied()));
        let now_ms = self.clock.now().timestamp_millis();
        Ok(self
            .store
            .find::<Value>(content_type.collection(), &query)
            .await?
            .into_iter()
            .filter(|doc| is_live(doc, now_ms))
            .filter_map(|doc| doc.get("id").and_then(Value::as_str).map(str::to_string))
            .collect())
    }
}

fn engagements_of(content_type: ContentType, content_id: &str) -> Filter {
    Filter::eq("content_type", content_type.as_str()).and(Filter::eq("content_id", content_id))
}

/// Content with an `expires_at` (stories) is engageable only before it.
fn is_live(doc: &Value, now_ms: i64) -> bool {
    doc.get("expires_at")
        .and_then(Value::as_i64)
        .is_none_or(|expires_at| now_ms < expires_at)
}
