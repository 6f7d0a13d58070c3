//! Ephemeral stories and their reclamation tombstones.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::blob::BlobRef;
use crate::constants::STORY_TTL_HOURS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub owner_id: String,
    pub media_ref: BlobRef,
    #[serde(default)]
    pub thumbnail_ref: Option<BlobRef>,
    pub media_type: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub published_at: DateTime<Utc>,
    /// Fixed at creation; never extended.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub views_count: i64,
    #[serde(default)]
    pub likes_count: i64,
}

impl Story {
    /// Expiry for a story published at `published_at`.
    pub fn expiry_for(published_at: DateTime<Utc>) -> DateTime<Utc> {
        published_at + TimeDelta::hours(STORY_TTL_HOURS)
    }

    /// A story is live strictly before its expiry instant.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Blob refs owned by this story, media first.
    pub fn blob_refs(&self) -> impl Iterator<Item = &BlobRef> {
        std::iter::once(&self.media_ref).chain(self.thumbnail_ref.iter())
    }
}

/// What caused a story to be reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReclaimTrigger {
    /// Fetched by id after expiry.
    Read,
    /// Periodic batch sweep.
    Sweep,
    /// Deleted early by its owner.
    Owner,
}

impl ReclaimTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Sweep => "sweep",
            Self::Owner => "owner",
        }
    }
}

impl fmt::Display for ReclaimTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker left behind by reclamation so reads can answer `Gone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryTombstone {
    pub id: String,
    pub owner_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub reclaimed_at: DateTime<Utc>,
    pub trigger: ReclaimTrigger,
    /// Set until the `stories_count` decrement and like purge have been
    /// applied; the sweep finishes any cascade left pending.
    #[serde(default)]
    pub cascade_pending: bool,
}

impl StoryTombstone {
    pub fn for_story(story: &Story, reclaimed_at: DateTime<Utc>, trigger: ReclaimTrigger) -> Self {
        Self {
            id: story.id.clone(),
            owner_id: story.owner_id.clone(),
            expires_at: story.expires_at,
            reclaimed_at,
            trigger,
            cascade_pending: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story_at(published_at: DateTime<Utc>) -> Story {
        Story {
            id: "s1".to_string(),
            owner_id: "alice".to_string(),
            media_ref: BlobRef::from("stories/a.jpg"),
            thumbnail_ref: Some(BlobRef::from("stories/a-thumb.jpg")),
            media_type: "image/jpeg".to_string(),
            published_at,
            expires_at: Story::expiry_for(published_at),
            views_count: 0,
            likes_count: 0,
        }
    }

    #[test]
    fn test_expiry_is_24_hours() {
        let t0 = Utc::now();
        assert_eq!(Story::expiry_for(t0) - t0, TimeDelta::hours(24));
    }

    #[test]
    fn test_live_boundary_is_exclusive() {
        let t0 = Utc::now();
        let story = story_at(t0);
        assert!(story.is_live(t0 + TimeDelta::hours(23)));
        assert!(!story.is_live(story.expires_at));
        assert!(!story.is_live(t0 + TimeDelta::hours(25)));
    }

    #[test]
    fn test_blob_refs_lists_media_then_thumbnail() {
        let story = story_at(Utc::now());
        let refs: Vec<_> = story.blob_refs().map(BlobRef::as_str).collect();
        assert_eq!(refs, vec!["stories/a.jpg", "stories/a-thumb.jpg"]);
    }
}
