//! Property-based tests for counter consistency.
//!
//! # Tested Invariants
//!
//! - `likes_count` equals the number of engagement records after any
//!   sequence of likes, unlikes and bulk likes
//! - follow counters equal the number of accepted edges after any sequence
//!   of follow-state transitions
//! - counters never go negative
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test consistency_properties
//! ```

mod common;

use proptest::prelude::*;
use std::collections::HashSet;

use common::TestPlaza;
use plaza::model::{ContentType, EdgeId, FollowStatus, Page};

// ============================================================================
// Test Strategies - Input Generation
// ============================================================================

const ACTORS: [&str; 4] = ["ana", "ben", "cai", "dee"];
const POSTS: [&str; 3] = ["p0", "p1", "p2"];

#[derive(Debug, Clone)]
enum LikeOp {
    Like { actor: usize, post: usize },
    Unlike { actor: usize, post: usize },
    Bulk { actor: usize, posts: Vec<usize> },
}

fn like_op_strategy() -> impl Strategy<Value = LikeOp> {
    prop_oneof![
        (0..ACTORS.len(), 0..POSTS.len()).prop_map(|(actor, post)| LikeOp::Like { actor, post }),
        (0..ACTORS.len(), 0..POSTS.len()).prop_map(|(actor, post)| LikeOp::Unlike { actor, post }),
        (0..ACTORS.len(), prop::collection::vec(0..POSTS.len() + 1, 0..6))
            .prop_map(|(actor, posts)| LikeOp::Bulk { actor, posts }),
    ]
}

#[derive(Debug, Clone, Copy)]
enum FollowOp {
    Request,
    Accept,
    Reject,
    Cancel,
    Unfollow,
}

fn follow_op_strategy() -> impl Strategy<Value = (usize, usize, FollowOp)> {
    let op = prop_oneof![
        Just(FollowOp::Request),
        Just(FollowOp::Accept),
        Just(FollowOp::Reject),
        Just(FollowOp::Cancel),
        Just(FollowOp::Unfollow),
    ];
    (0..ACTORS.len(), 0..ACTORS.len(), op)
}

// ============================================================================
// Ledger Invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Invariant: each post's `likes_count` equals its record count and
    /// matches a simple set model of who likes what.
    #[test]
    fn likes_count_tracks_records(ops in prop::collection::vec(like_op_strategy(), 0..60)) {
        tokio_test::block_on(async {
            let t = TestPlaza::new();
            for post in POSTS {
                t.seed(ContentType::Post, post, "owner").await;
            }
            let ledger = &t.services.ledger;
            let mut model: HashSet<(usize, usize)> = HashSet::new();

            for op in ops {
                match op {
                    LikeOp::Like { actor, post } => {
                        let result =
                            ledger.like(ACTORS[actor], ContentType::Post, POSTS[post]).await;
                        prop_assert_eq!(result.is_ok(), model.insert((actor, post)));
                    },
                    LikeOp::Unlike { actor, post } => {
                        let result =
                            ledger.unlike(ACTORS[actor], ContentType::Post, POSTS[post]).await;
                        prop_assert_eq!(result.is_ok(), model.remove(&(actor, post)));
                    },
                    LikeOp::Bulk { actor, posts } => {
                        // Index POSTS.len() stands for a missing post
                        let batch: Vec<String> = posts
                            .iter()
                            .map(|&p| {
                                POSTS.get(p).map_or("missing".to_string(), |id| (*id).to_string())
                            })
                            .collect();
                        let result = ledger
                            .bulk_like(ACTORS[actor], ContentType::Post, &batch)
                            .await
                            .unwrap();
                        for id in &result.newly_liked {
                            let post = POSTS.iter().position(|p| p == id).unwrap();
                            prop_assert!(model.insert((actor, post)));
                        }
                        for id in &result.already_liked {
                            let post = POSTS.iter().position(|p| p == id).unwrap();
                            prop_assert!(model.contains(&(actor, post)));
                        }
                    },
                }
            }

            for (index, post) in POSTS.iter().enumerate() {
                let expected = model.iter().filter(|(_, p)| *p == index).count() as i64;
                let likes = t.likes(ContentType::Post, post).await;
                prop_assert!(likes >= 0);
                prop_assert_eq!(likes, expected);
                let records = ledger
                    .likers(ContentType::Post, post, Page::new(0, 100))
                    .await
                    .unwrap();
                prop_assert_eq!(records.len() as i64, expected);
            }
            prop_assert!(ledger.reconcile(ContentType::Post).await.unwrap().is_consistent());
            Ok(())
        })?;
    }
}

// ============================================================================
// Follow Graph Invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Invariant: follower/following counters equal accepted-edge counts
    /// whatever transitions were attempted, legal or not.
    #[test]
    fn follow_counters_track_accepted_edges(
        ops in prop::collection::vec(follow_op_strategy(), 0..60)
    ) {
        tokio_test::block_on(async {
            let t = TestPlaza::new();
            let follows = &t.services.follows;

            for (from, to, op) in ops {
                let (follower, following) = (ACTORS[from], ACTORS[to]);
                let edge = EdgeId::new(follower, following);
                // Transitions may legitimately fail; only the counters matter
                let _ = match op {
                    FollowOp::Request => {
                        follows.request_follow(follower, following).await.map(|_| ())
                    },
                    FollowOp::Accept => follows.accept_request(following, &edge).await.map(|_| ()),
                    FollowOp::Reject => follows.reject_request(following, &edge).await.map(|_| ()),
                    FollowOp::Cancel => follows.cancel_request(follower, &edge).await.map(|_| ()),
                    FollowOp::Unfollow => follows.unfollow(follower, &edge).await.map(|_| ()),
                };
            }

            for actor in ACTORS {
                let profile = t.profile(actor).await;
                prop_assert!(profile.followers_count >= 0);
                prop_assert!(profile.following_count >= 0);

                let followers = follows.list_followers(actor, Page::new(0, 100)).await.unwrap();
                let following = follows.list_following(actor, Page::new(0, 100)).await.unwrap();
                prop_assert!(followers.iter().all(|e| e.status == FollowStatus::Accepted));
                prop_assert_eq!(profile.followers_count, followers.len() as i64);
                prop_assert_eq!(profile.following_count, following.len() as i64);
            }
            Ok(())
        })?;
    }
}
