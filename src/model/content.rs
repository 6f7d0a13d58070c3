//! Engageable content and ledger records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kinds of content that carry a `likes_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Post,
    Video,
    Reel,
    Story,
    UserAsset,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Post,
        ContentType::Video,
        ContentType::Reel,
        ContentType::Story,
        ContentType::UserAsset,
    ];

    /// Document-store collection holding this kind of content.
    pub fn collection(self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Video => "videos",
            Self::Reel => "reels",
            Self::Story => "stories",
            Self::UserAsset => "user_assets",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Video => "video",
            Self::Reel => "reel",
            Self::Story => "story",
            Self::UserAsset => "user_asset",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "post" => Ok(Self::Post),
            "video" => Ok(Self::Video),
            "reel" => Ok(Self::Reel),
            "story" => Ok(Self::Story),
            "user_asset" | "userasset" | "user-asset" => Ok(Self::UserAsset),
            other => Err(format!(
                "unknown content type '{other}' (expected post, video, reel, story or user_asset)"
            )),
        }
    }
}

/// Generic engageable item (post, video, reel, user asset).
///
/// Stories have their own richer document but share the `id`, `owner_id`
/// and `likes_count` fields, which is all the ledger reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            likes_count: 0,
            created_at,
        }
    }
}

/// One active like. Created on like, destroyed on unlike, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub actor_id: String,
    pub content_type: ContentType,
    pub content_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl EngagementRecord {
    /// Ledger key; the store's insert-if-absent on this key is the
    /// uniqueness constraint over (actor, content type, content id).
    pub fn key(actor_id: &str, content_type: ContentType, content_id: &str) -> String {
        format!("{actor_id}:{content_type}:{content_id}")
    }

    pub fn id(&self) -> String {
        Self::key(&self.actor_id, self.content_type, &self.content_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_round_trips_through_str() {
        for ct in ContentType::ALL {
            assert_eq!(ct.as_str().parse::<ContentType>().unwrap(), ct);
        }
        assert_eq!("userAsset".parse::<ContentType>().unwrap(), ContentType::UserAsset);
        assert!("comment".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_content_type_serializes_snake_case() {
        let json = serde_json::to_string(&ContentType::UserAsset).unwrap();
        assert_eq!(json, "\"user_asset\"");
    }

    #[test]
    fn test_record_key_is_compound() {
        let record = EngagementRecord {
            actor_id: "alice".to_string(),
            content_type: ContentType::Reel,
            content_id: "r1".to_string(),
            created_at: Utc::now(),
        };
        assert_eq!(record.id(), "alice:reel:r1");
        assert_ne!(
            EngagementRecord::key("alice", ContentType::Post, "r1"),
            record.id()
        );
    }

    #[test]
    fn test_timestamps_stored_as_millis() {
        let created_at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let item = ContentItem::new("p1", "bob", created_at);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["created_at"], serde_json::json!(1_700_000_000_123_i64));
    }
}
