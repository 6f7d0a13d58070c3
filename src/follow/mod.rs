//! Relationship State Machine for directed follow edges.
//!
//! ```text
//! (none) --request--> pending --accept--> accepted --unfollow--> (deleted)
//!                        |  \--reject--> rejected --request--> pending
//!                        \--cancel--> (deleted)
//! ```
//!
//! There is at most one edge per directed pair: the edge id is derived from
//! the pair and created with insert-if-absent. Every transition is a
//! compare-and-swap (or guarded delete) on the expected prior status, so two
//! racing transitions cannot both apply their counter side effects.
//! `followers_count`/`following_count` only ever move on `accepted` edges.


use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::counters;
use crate::error::{Error, Result, validate_id};
use crate::metrics;
use crate::model::{EdgeId, FollowEdge, FollowStatus, Page, Profile, collections, fields};
use crate::store::{DocumentStore, Filter, Order, Query};

const EDGE: &str = "follow edge";

/// Attempts at resolving a request that races another writer on the same pair.
const REQUEST_ATTEMPTS: usize = 3;

/// Follow counters recomputed from accepted edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileReconciliation {
    pub followers_count: i64,
    pub following_count: i64,
    /// Whether either stored counter had drifted and was rewritten.
    pub corrected: bool,
}

/// Follow-graph operations over a document store.
#[derive(Clone)]
pub struct FollowGraph {
    store: DocumentStore,
    clock: Arc<dyn Clock>,
}

impl FollowGraph {
    pub fn new(store: DocumentStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Creates a pending request from `follower_id` to `following_id`.
    ///
    /// A previously rejected edge for the pair is overwritten in place and
    /// becomes pending again.
    ///
    /// # Errors
    ///
    /// - `SelfFollowNotAllowed` if both ids are equal
    /// - `DuplicateRequest` if a pending or accepted edge exists for the pair
    pub async fn request_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<FollowEdge> {
        validate_id("follower", follower_id)?;
        validate_id("following", following_id)?;
        if follower_id == following_id {
            return Err(Error::SelfFollowNotAllowed);
        }

        let edge = FollowEdge::pending(follower_id, following_id, self.clock.now());
        let id = edge.id.as_str();

        for _ in 0..REQUEST_ATTEMPTS {
            if self.store.insert(collections::FOLLOW_EDGES, id, &edge).await? {
                metrics::record_follow_transition("request");
                info!(follower = follower_id, following = following_id, "Follow requested");
                return Ok(edge);
            }

            let existing: Option<FollowEdge> = self.store.get(collections::FOLLOW_EDGES, id).await?;
            match existing {
                // Deleted since the insert failed; try again
                None => continue,
                Some(existing) if existing.status == FollowStatus::Rejected => {
                    let renewed = self
                        .store
                        .replace_if(
                            collections::FOLLOW_EDGES,
                            id,
                            &status_is(FollowStatus::Rejected),
                            &edge,
                        )
                        .await?;
                    if renewed.is_some() {
                        metrics::record_follow_transition("rerequest");
                        info!(
                            follower = follower_id,
                            following = following_id,
                            "Follow re-requested over rejected edge"
                        );
                        return Ok(edge);
                    }
                },
                Some(_) => break,
            }
        }

        Err(Error::DuplicateRequest {
            follower: follower_id.to_string(),
            following: following_id.to_string(),
        })
    }

    /// Accepts a pending request. Only the followed actor may accept.
    ///
    /// Increments the follower's `following_count` and the target's
    /// `followers_count` exactly once.
    pub async fn accept_request(&self, actor_id: &str, edge_id: &EdgeId) -> Result<FollowEdge> {
        let accepted = self
            .respond(actor_id, edge_id, FollowStatus::Accepted, "accept")
            .await?;

        counters::adjust_profile(&self.store, &accepted.follower_id, fields::FOLLOWING_COUNT, 1)
            .await?;
        counters::adjust_profile(&self.store, &accepted.following_id, fields::FOLLOWERS_COUNT, 1)
            .await?;

        metrics::record_follow_transition("accept");
        info!(
            follower = %accepted.follower_id,
            following = %accepted.following_id,
            "Follow accepted"
        );
        Ok(accepted)
    }

    /// Rejects a pending request. Only the followed actor may reject.
    pub async fn reject_request(&self, actor_id: &str, edge_id: &EdgeId) -> Result<FollowEdge> {
        let rejected = self
            .respond(actor_id, edge_id, FollowStatus::Rejected, "reject")
            .await?;

        metrics::record_follow_transition("reject");
        info!(
            follower = %rejected.follower_id,
            following = %rejected.following_id,
            "Follow rejected"
        );
        Ok(rejected)
    }

    /// Withdraws a pending request. Only the follower may cancel.
    pub async fn cancel_request(&self, actor_id: &str, edge_id: &EdgeId) -> Result<FollowEdge> {
        let edge = self.load(edge_id).await?;
        if edge.follower_id != actor_id {
            return Err(Error::forbidden(actor_id, format!("cancel follow request '{edge_id}'")));
        }
        if edge.status != FollowStatus::Pending {
            return Err(invalid_state(edge_id, edge.status, "cancel"));
        }

        let Some(removed) = self
            .store
            .take::<FollowEdge>(
                collections::FOLLOW_EDGES,
                edge_id.as_str(),
                Some(&status_is(FollowStatus::Pending)),
            )
            .await?
        else {
            return Err(self.conflict(edge_id, "cancel").await);
        };

        metrics::record_follow_transition("cancel");
        info!(
            follower = %removed.follower_id,
            following = %removed.following_id,
            "Follow request cancelled"
        );
        Ok(removed)
    }

    /// Severs an accepted edge. Either party may unfollow.
    ///
    /// Decrements both counters (floor-clamped).
    pub async fn unfollow(&self, actor_id: &str, edge_id: &EdgeId) -> Result<FollowEdge> {
        let edge = self.load(edge_id).await?;
        if !edge.involves(actor_id) {
            return Err(Error::forbidden(actor_id, format!("sever follow edge '{edge_id}'")));
        }
        if edge.status != FollowStatus::Accepted {
            return Err(invalid_state(edge_id, edge.status, "unfollow"));
        }

        let Some(removed) = self
            .store
            .take::<FollowEdge>(
                collections::FOLLOW_EDGES,
                edge_id.as_str(),
                Some(&status_is(FollowStatus::Accepted)),
            )
            .await?
        else {
            return Err(self.conflict(edge_id, "unfollow").await);
        };

        counters::adjust_profile(&self.store, &removed.follower_id, fields::FOLLOWING_COUNT, -1)
            .await?;
        counters::adjust_profile(&self.store, &removed.following_id, fields::FOLLOWERS_COUNT, -1)
            .await?;

        metrics::record_follow_transition("unfollow");
        info!(
            actor = actor_id,
            follower = %removed.follower_id,
            following = %removed.following_id,
            "Unfollowed"
        );
        Ok(removed)
    }

    /// The current edge for a directed pair, if any.
    pub async fn edge_between(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<Option<FollowEdge>> {
        let id = EdgeId::new(follower_id, following_id);
        Ok(self.store.get(collections::FOLLOW_EDGES, id.as_str()).await?)
    }

    /// Accepted edges pointing at `actor_id`, most recently accepted first.
    pub async fn list_followers(&self, actor_id: &str, page: Page) -> Result<Vec<FollowEdge>> {
        let filter = Filter::eq("following_id", actor_id).and(status_is(FollowStatus::Accepted));
        self.list(filter, "responded_at", page).await
    }

    /// Accepted edges from `actor_id`, most recently accepted first.
    pub async fn list_following(&self, actor_id: &str, page: Page) -> Result<Vec<FollowEdge>> {
        let filter = Filter::eq("follower_id", actor_id).and(status_is(FollowStatus::Accepted));
        self.list(filter, "responded_at", page).await
    }

    /// Pending requests addressed to `actor_id`, newest first.
    pub async fn list_pending_requests(
        &self,
        actor_id: &str,
        page: Page,
    ) -> Result<Vec<FollowEdge>> {
        let filter = Filter::eq("following_id", actor_id).and(status_is(FollowStatus::Pending));
        self.list(filter, "requested_at", page).await
    }

    /// Recomputes an actor's follow counters from accepted edges.
    pub async fn reconcile_profile(&self, actor_id: &str) -> Result<ProfileReconciliation> {
        validate_id("actor", actor_id)?;

        let accepted = status_is(FollowStatus::Accepted);
        let followers = self
            .store
            .count(
                collections::FOLLOW_EDGES,
                &Filter::eq("following_id", actor_id).and(accepted.clone()),
            )
            .await?;
        let following = self
            .store
            .count(
                collections::FOLLOW_EDGES,
                &Filter::eq("follower_id", actor_id).and(accepted),
            )
            .await?;
        let (followers, following) = (followers as i64, following as i64);

        self.store
            .insert(collections::PROFILES, actor_id, &Profile::new(actor_id))
            .await?;
        let mut corrected = false;
        for (field, actual) in [
            (fields::FOLLOWERS_COUNT, followers),
            (fields::FOLLOWING_COUNT, following),
        ] {
            if let Some(previous) =
                counters::set_counter(&self.store, collections::PROFILES, actor_id, field, actual)
                    .await?
            {
                info!(
                    actor = actor_id,
                    field,
                    previous,
                    actual,
                    "Corrected drifted follow counter"
                );
                corrected = true;
            }
        }

        Ok(ProfileReconciliation {
            followers_count: followers,
            following_count: following,
            corrected,
        })
    }

    /// Shared accept/reject path: pending -> `status`, by the followed actor.
    async fn respond(
        &self,
        actor_id: &str,
        edge_id: &EdgeId,
        status: FollowStatus,
        operation: &'static str,
    ) -> Result<FollowEdge> {
        let edge = self.load(edge_id).await?;
        if edge.following_id != actor_id {
            return Err(Error::forbidden(
                actor_id,
                format!("{operation} follow request '{edge_id}'"),
            ));
        }
        if edge.status != FollowStatus::Pending {
            return Err(invalid_state(edge_id, edge.status, operation));
        }

        let updated = FollowEdge {
            status,
            responded_at: Some(self.clock.now()),
            ..edge
        };
        let swapped = self
            .store
            .replace_if(
                collections::FOLLOW_EDGES,
                edge_id.as_str(),
                &status_is(FollowStatus::Pending),
                &updated,
            )
            .await?;
        if swapped.is_none() {
            return Err(self.conflict(edge_id, operation).await);
        }
        Ok(updated)
    }

    async fn load(&self, edge_id: &EdgeId) -> Result<FollowEdge> {
        self.store
            .get(collections::FOLLOW_EDGES, edge_id.as_str())
            .await?
            .ok_or_else(|| Error::not_found(EDGE, edge_id.as_str()))
    }

    /// Error for a transition whose guarded write lost a race.
    async fn conflict(&self, edge_id: &EdgeId, operation: &'static str) -> Error {
        debug!(edge = %edge_id, operation, "Edge changed during transition");
        match self.load(edge_id).await {
            Ok(edge) => invalid_state(edge_id, edge.status, operation),
            Err(e) => e,
        }
    }

    async fn list(&self, filter: Filter, sort_field: &str, page: Page) -> Result<Vec<FollowEdge>> {
        let query = Query::new(filter)
            .sort(sort_field, Order::Desc)
            .skip(page.skip)
            .limit(page.limit);
        Ok(self.store.find(collections::FOLLOW_EDGES, &query).await?)
    }
}

fn status_is(status: FollowStatus) -> Filter {
    Filter::eq("status", status.as_str())
}

fn invalid_state(edge_id: &EdgeId, status: FollowStatus, operation: &'static str) -> Error {
    Error::invalid_state(EDGE, edge_id.as_str(), status.as_str(), operation)
}
