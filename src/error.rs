//! Error types for the engagement core.
//!
//! Every operation exposed to the route layer returns [`Result`]. State and
//! identity failures are typed so callers can map them to responses without
//! string matching; collaborator failures (document store, blob store) are
//! carried through [`Error::Storage`].

use crate::model::ContentType;

/// Result type for engagement-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Engagement-core errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Entity never existed.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Entity existed but expired or was reclaimed.
    #[error("{entity} is gone: {id}")]
    Gone { entity: &'static str, id: String },

    /// Engagement target does not exist (or is no longer live).
    #[error("{content_type} not found: {id}")]
    ContentNotFound { content_type: ContentType, id: String },

    /// Actor already has an active like on the target.
    #[error("{content_type} '{id}' is already liked by '{actor}'")]
    AlreadyLiked {
        actor: String,
        content_type: ContentType,
        id: String,
    },

    /// Actor has no active like on the target.
    #[error("{content_type} '{id}' is not liked by '{actor}'")]
    NotLiked {
        actor: String,
        content_type: ContentType,
        id: String,
    },

    /// A follow edge already exists for the pair.
    #[error("follow request from '{follower}' to '{following}' already exists")]
    DuplicateRequest { follower: String, following: String },

    /// Transition not allowed from the entity's current state.
    #[error("cannot {operation} {entity} '{id}' in state '{state}'")]
    InvalidState {
        entity: &'static str,
        id: String,
        state: String,
        operation: &'static str,
    },

    /// Caller lacks authority over the target entity.
    #[error("'{actor}' is not allowed to {action}")]
    Forbidden { actor: String, action: String },

    /// Actor attempted to follow themselves.
    #[error("actors cannot follow themselves")]
    SelfFollowNotAllowed,

    /// Bulk request exceeds the configured cap.
    #[error("batch of {size} items exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// Malformed input (empty ids, reserved characters, empty media).
    #[error("invalid input: {0}")]
    Validation(String),

    /// Blob upload failed during publish; nothing was persisted.
    #[error("blob upload failed: {reason}")]
    BlobUpload { reason: String },

    /// Document store or other collaborator failure.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl Error {
    /// Create a not-found error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create a gone error.
    pub fn gone(entity: &'static str, id: impl Into<String>) -> Self {
        Self::Gone {
            entity,
            id: id.into(),
        }
    }

    /// Create an invalid-state error.
    pub fn invalid_state(
        entity: &'static str,
        id: impl Into<String>,
        state: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.into(),
            state: state.into(),
            operation,
        }
    }

    /// Create a forbidden error.
    pub fn forbidden(actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Forbidden {
            actor: actor.into(),
            action: action.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    /// Get the HTTP status code the route layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } | Self::ContentNotFound { .. } => 404,
            Self::Gone { .. } => 410,
            Self::AlreadyLiked { .. }
            | Self::NotLiked { .. }
            | Self::DuplicateRequest { .. }
            | Self::InvalidState { .. } => 409,
            Self::Forbidden { .. } => 403,
            Self::SelfFollowNotAllowed | Self::BatchTooLarge { .. } | Self::Validation(_) => 400,
            Self::BlobUpload { .. } | Self::Storage(_) => 500,
        }
    }
}

/// A decrement that would have taken a counter below zero.
///
/// Never returned to callers: the counter is clamped at zero and this is
/// logged as a warning. Concurrent unlikes/unfollows can legitimately race
/// a counter past its floor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("counter underflow on {collection}/{id}.{field}: clamped {attempted} to 0")]
pub struct CounterUnderflow {
    pub collection: String,
    pub id: String,
    pub field: String,
    /// Value the counter would have had without clamping.
    pub attempted: i64,
}

/// Reject ids that are empty or contain the key separator.
///
/// Compound keys (ledger records, follow edges) are built by joining ids with
/// `:`, so a separator inside an id could alias two different keys.
pub(crate) fn validate_id(kind: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::validation(format!("{kind} id cannot be empty")));
    }
    if id.contains(':') || id.contains('/') {
        return Err(Error::validation(format!(
            "{kind} id cannot contain ':' or '/': {id}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::not_found("story", "s1").status_code(), 404);
        assert_eq!(Error::gone("story", "s1").status_code(), 410);
        assert_eq!(Error::SelfFollowNotAllowed.status_code(), 400);
        assert_eq!(Error::forbidden("a", "accept").status_code(), 403);
        assert_eq!(
            Error::invalid_state("follow edge", "a:b", "accepted", "accept").status_code(),
            409
        );
        assert_eq!(
            Error::Storage(anyhow::anyhow!("disk full")).status_code(),
            500
        );
    }

    #[test]
    fn test_gone_and_not_found_are_distinct() {
        let gone = Error::gone("story", "s1");
        let missing = Error::not_found("story", "s1");
        assert!(matches!(gone, Error::Gone { .. }));
        assert!(matches!(missing, Error::NotFound { .. }));
        assert_ne!(gone.to_string(), missing.to_string());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("actor", "alice").is_ok());
        assert!(validate_id("actor", "").is_err());
        assert!(validate_id("actor", "   ").is_err());
        assert!(validate_id("actor", "a:b").is_err());
        assert!(validate_id("actor", "a/b").is_err());
    }

    #[test]
    fn test_underflow_message() {
        let underflow = CounterUnderflow {
            collection: "posts".to_string(),
            id: "p1".to_string(),
            field: "likes_count".to_string(),
            attempted: -1,
        };
        assert_eq!(
            underflow.to_string(),
            "counter underflow on posts/p1.likes_count: clamped -1 to 0"
        );
    }
}
