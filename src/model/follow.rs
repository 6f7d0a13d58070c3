//! Directed follow edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a follow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FollowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for FollowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of the edge between an ordered actor pair.
///
/// There is at most one edge per pair, so the id is derived from the pair
/// itself and doubles as the store-level uniqueness key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    pub fn new(follower_id: &str, following_id: &str) -> Self {
        Self(format!("{follower_id}:{following_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub id: EdgeId,
    pub follower_id: String,
    pub following_id: String,
    pub status: FollowStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub requested_at: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub responded_at: Option<DateTime<Utc>>,
}

impl FollowEdge {
    /// A fresh pending request.
    pub fn pending(follower_id: &str, following_id: &str, requested_at: DateTime<Utc>) -> Self {
        Self {
            id: EdgeId::new(follower_id, following_id),
            follower_id: follower_id.to_string(),
            following_id: following_id.to_string(),
            status: FollowStatus::Pending,
            requested_at,
            responded_at: None,
        }
    }

    /// Whether `actor` is one of the two endpoints.
    pub fn involves(&self, actor: &str) -> bool {
        self.follower_id == actor || self.following_id == actor
    }
}
