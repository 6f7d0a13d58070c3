//! Follow request workflows across the public API.

mod common;

use common::TestPlaza;
use plaza::Error;
use plaza::model::{EdgeId, FollowStatus, Page};

#[tokio::test]
async fn test_request_accept_unfollow_round() {
    let t = TestPlaza::new();
    let follows = &t.services.follows;

    let edge = follows.request_follow("ana", "ben").await.unwrap();
    assert_eq!(edge.id, EdgeId::new("ana", "ben"));
    assert_eq!(t.profile("ben").await.followers_count, 0);

    follows.accept_request("ben", &edge.id).await.unwrap();
    assert_eq!(t.profile("ben").await.followers_count, 1);
    assert_eq!(t.profile("ana").await.following_count, 1);
    assert_eq!(
        follows.edge_between("ana", "ben").await.unwrap().unwrap().status,
        FollowStatus::Accepted
    );

    follows.unfollow("ben", &edge.id).await.unwrap();
    assert_eq!(t.profile("ben").await.followers_count, 0);
    assert_eq!(t.profile("ana").await.following_count, 0);

    // The pair is free for a fresh request
    let again = follows.request_follow("ana", "ben").await.unwrap();
    assert_eq!(again.status, FollowStatus::Pending);
}

#[tokio::test]
async fn test_rejected_request_can_be_renewed() {
    let t = TestPlaza::new();
    let follows = &t.services.follows;

    let edge = follows.request_follow("ana", "ben").await.unwrap();
    follows.reject_request("ben", &edge.id).await.unwrap();
    assert!(follows.list_pending_requests("ben", Page::default()).await.unwrap().is_empty());

    let renewed = follows.request_follow("ana", "ben").await.unwrap();
    assert_eq!(renewed.status, FollowStatus::Pending);
    assert_eq!(follows.list_pending_requests("ben", Page::default()).await.unwrap().len(), 1);

    let err = follows.request_follow("ana", "ben").await.unwrap_err();
    assert!(matches!(err, Error::DuplicateRequest { .. }));
    assert_eq!(err.status_code(), 409);
}

#[tokio::test]
async fn test_accept_and_cancel_race_settles_consistently() {
    for _ in 0..20 {
        let t = TestPlaza::new();
        let follows = t.services.follows.clone();
        let edge = follows.request_follow("ana", "ben").await.unwrap();

        let accept = {
            let follows = follows.clone();
            let id = edge.id.clone();
            tokio::spawn(async move { follows.accept_request("ben", &id).await })
        };
        let cancel = {
            let follows = follows.clone();
            let id = edge.id.clone();
            tokio::spawn(async move { follows.cancel_request("ana", &id).await })
        };
        let accepted = accept.await.unwrap().is_ok();
        let cancelled = cancel.await.unwrap().is_ok();

        assert!(accepted ^ cancelled, "exactly one transition wins");
        let expected = i64::from(accepted);
        assert_eq!(t.profile("ben").await.followers_count, expected);
        assert_eq!(t.profile("ana").await.following_count, expected);
        assert_eq!(follows.edge_between("ana", "ben").await.unwrap().is_some(), accepted);
    }
}

#[tokio::test]
async fn test_counters_match_accepted_edges() {
    let t = TestPlaza::new();
    let follows = &t.services.follows;
    let fans = ["f1", "f2", "f3", "f4", "f5"];

    for fan in fans {
        let edge = follows.request_follow(fan, "star").await.unwrap();
        if fan != "f3" {
            follows.accept_request("star", &edge.id).await.unwrap();
        }
    }
    follows.unfollow("f5", &EdgeId::new("f5", "star")).await.unwrap();
    follows.reject_request("star", &EdgeId::new("f3", "star")).await.unwrap();

    let followers = follows.list_followers("star", Page::default()).await.unwrap();
    assert_eq!(followers.len(), 3);
    assert_eq!(t.profile("star").await.followers_count, 3);

    let report = follows.reconcile_profile("star").await.unwrap();
    assert!(!report.corrected);
    assert_eq!(report.followers_count, 3);
}
