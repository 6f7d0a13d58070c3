//! Per-actor denormalized counters.

use serde::{Deserialize, Serialize};

/// Counter document for an actor.
///
/// Identity lives with the identity collaborator; this document only holds
/// the counters owned by the follow graph and the story manager, and is
/// created lazily on first counter update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub stories_count: i64,
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}
