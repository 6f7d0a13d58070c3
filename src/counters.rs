//! Floor-clamped counter updates shared by every component.
//!
//! All denormalized counters (`likes_count`, `followers_count`,
//! `following_count`, `stories_count`, `views_count`) change through these
//! helpers. A decrement that would go below zero is clamped by the store and
//! surfaces here as a logged [`CounterUnderflow`], never as an error.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CounterUnderflow, Result};
use crate::metrics;
use crate::model::{Profile, collections};
use crate::store::{CounterUpdate, DocumentStore, Filter};

/// CAS attempts before `set_counter` gives up on a hot document.
const SET_ATTEMPTS: usize = 3;

fn report(collection: &str, id: &str, field: &str, update: &CounterUpdate) {
    if update.clamped() {
        let underflow = CounterUnderflow {
            collection: collection.to_string(),
            id: id.to_string(),
            field: field.to_string(),
            attempted: update.unclamped,
        };
        warn!(collection, id, field, attempted = update.unclamped, "{underflow}");
        metrics::record_counter_underflow(field);
    }
}

/// Adjusts a counter, returning the new value or `None` if the document is missing.
pub(crate) async fn adjust(
    store: &DocumentStore,
    collection: &str,
    id: &str,
    field: &str,
    delta: i64,
) -> Result<Option<i64>> {
    let update = store.increment(collection, id, field, delta).await?;
    if let Some(update) = &update {
        report(collection, id, field, update);
    }
    Ok(update.map(|u| u.value))
}

/// Adjusts the same counter on several documents in one batch.
pub(crate) async fn adjust_many(
    store: &DocumentStore,
    collection: &str,
    ids: &[String],
    field: &str,
    delta: i64,
) -> Result<Vec<(String, i64)>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let updates = store.increment_many(collection, ids, field, delta).await?;
    Ok(updates
        .into_iter()
        .map(|(id, update)| {
            report(collection, &id, field, &update);
            (id, update.value)
        })
        .collect())
}

/// Adjusts a profile counter, creating the profile document on first use.
pub(crate) async fn adjust_profile(
    store: &DocumentStore,
    actor_id: &str,
    field: &str,
    delta: i64,
) -> Result<i64> {
    if store
        .insert(collections::PROFILES, actor_id, &Profile::new(actor_id))
        .await?
    {
        debug!(actor = actor_id, "Created profile counters");
    }
    let value = adjust(store, collections::PROFILES, actor_id, field, delta).await?;
    Ok(value.unwrap_or(0))
}

/// Overwrites a counter with a recomputed value.
///
/// Compare-and-swap on the field's current value, so an increment racing
/// the reconciliation is never silently lost: the swap fails and is retried
/// against the fresh value. Returns the previous value when a correction
/// was written, `None` when the counter was already right or the document
/// is missing.
pub(crate) async fn set_counter(
    store: &DocumentStore,
    collection: &str,
    id: &str,
    field: &str,
    value: i64,
) -> Result<Option<i64>> {
    for _ in 0..SET_ATTEMPTS {
        let Some(mut doc) = store.get_raw(collection, id).await? else {
            return Ok(None);
        };
        let current = doc.get(field).and_then(Value::as_i64).unwrap_or(0);
        if current == value {
            return Ok(None);
        }

        let guard = Filter::eq(field, doc.get(field).cloned().unwrap_or(Value::Null));
        if let Some(object) = doc.as_object_mut() {
            object.insert(field.to_string(), Value::from(value));
        }
        if store.replace_if(collection, id, &guard, &doc).await?.is_some() {
            return Ok(Some(current));
        }
        debug!(collection, id, field, "Counter changed during reconciliation, retrying");
    }

    warn!(collection, id, field, "Gave up reconciling a contended counter");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fields;

    #[tokio::test]
    async fn test_adjust_profile_creates_lazily() {
        let store = DocumentStore::memory();

        let value = adjust_profile(&store, "alice", fields::FOLLOWERS_COUNT, 1).await.unwrap();
        assert_eq!(value, 1);

        let profile: Profile = store.get(collections::PROFILES, "alice").await.unwrap().unwrap();
        assert_eq!(profile.followers_count, 1);
        assert_eq!(profile.following_count, 0);
    }

    #[tokio::test]
    async fn test_decrement_below_zero_clamps() {
        let store = DocumentStore::memory();

        let value = adjust_profile(&store, "bob", fields::STORIES_COUNT, -1).await.unwrap();
        assert_eq!(value, 0);

        let profile: Profile = store.get(collections::PROFILES, "bob").await.unwrap().unwrap();
        assert_eq!(profile.stories_count, 0);
    }

    #[tokio::test]
    async fn test_adjust_missing_document() {
        let store = DocumentStore::memory();
        let value = adjust(&store, "posts", "ghost", fields::LIKES_COUNT, 1).await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_set_counter_corrects_drift() {
        let store = DocumentStore::memory();
        store
            .insert("posts", "p1", &serde_json::json!({"id": "p1", "likes_count": 5}))
            .await
            .unwrap();

        let previous = set_counter(&store, "posts", "p1", fields::LIKES_COUNT, 2).await.unwrap();
        assert_eq!(previous, Some(5));

        let unchanged = set_counter(&store, "posts", "p1", fields::LIKES_COUNT, 2).await.unwrap();
        assert_eq!(unchanged, None);

        let doc = store.get_raw("posts", "p1").await.unwrap().unwrap();
        assert_eq!(doc["likes_count"], 2);
    }

    #[tokio::test]
    async fn test_set_counter_on_missing_field() {
        let store = DocumentStore::memory();
        store.insert("posts", "p1", &serde_json::json!({"id": "p1"})).await.unwrap();

        let previous = set_counter(&store, "posts", "p1", fields::LIKES_COUNT, 3).await.unwrap();
        assert_eq!(previous, Some(0));
    }
}
