//! Persisted document types shared by the engagement components.
//!
//! All timestamps are serialized as epoch milliseconds so the document
//! store can evaluate range filters (expiry, retention) numerically.

mod content;
mod follow;
mod profile;
mod story;

pub use content::{ContentItem, ContentType, EngagementRecord};
pub use follow::{EdgeId, FollowEdge, FollowStatus};
pub use profile::Profile;
pub use story::{ReclaimTrigger, Story, StoryTombstone};

use crate::constants;

/// Collection names in the document store.
pub mod collections {
    pub const ENGAGEMENTS: &str = "engagements";
    pub const FOLLOW_EDGES: &str = "follow_edges";
    pub const PROFILES: &str = "profiles";
    pub const STORY_TOMBSTONES: &str = "story_tombstones";
}

/// Denormalized counter field names.
pub mod fields {
    pub const LIKES_COUNT: &str = "likes_count";
    pub const VIEWS_COUNT: &str = "views_count";
    pub const FOLLOWERS_COUNT: &str = "followers_count";
    pub const FOLLOWING_COUNT: &str = "following_count";
    pub const STORIES_COUNT: &str = "stories_count";
}

/// Offset pagination for listing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: usize,
    pub limit: usize,
}

impl Page {
    /// Creates a page, clamping `limit` to `1..=MAX_PAGE_SIZE`.
    pub fn new(skip: usize, limit: usize) -> Self {
        Self {
            skip,
            limit: limit.clamp(1, constants::MAX_PAGE_SIZE),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, constants::DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamps_limit() {
        assert_eq!(Page::new(0, 0).limit, 1);
        assert_eq!(Page::new(5, 10_000).limit, constants::MAX_PAGE_SIZE);
        assert_eq!(Page::default().limit, constants::DEFAULT_PAGE_SIZE);
    }
}
