//! Likes across content types through the public API.

mod common;

use common::{TestPlaza, ids};
use plaza::Error;
use plaza::model::{ContentType, Page};

#[tokio::test]
async fn test_bulk_like_mixed_batch() {
    let t = TestPlaza::new();
    let ledger = &t.services.ledger;
    t.seed(ContentType::Video, "v1", "owner").await;
    t.seed(ContentType::Video, "v2", "owner").await;
    ledger.like("ana", ContentType::Video, "v2").await.unwrap();

    let result = ledger
        .bulk_like("ana", ContentType::Video, &ids(&["v1", "v2", "v3", "v1"]))
        .await
        .unwrap();
    assert_eq!(result.newly_liked, ids(&["v1"]));
    assert_eq!(result.already_liked, ids(&["v2"]));
    assert_eq!(result.non_existent, ids(&["v3"]));
    assert_eq!(result.likes_counts.get("v1"), Some(&1));
    assert_eq!(t.likes(ContentType::Video, "v1").await, 1);
    assert_eq!(t.likes(ContentType::Video, "v2").await, 1);
}

#[tokio::test]
async fn test_bulk_like_over_limit_changes_nothing() {
    let t = TestPlaza::new();
    t.seed(ContentType::Reel, "r1", "owner").await;
    let batch: Vec<String> = std::iter::repeat_n("r1".to_string(), 51).collect();

    let err = t
        .services
        .ledger
        .bulk_like("ana", ContentType::Reel, &batch)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BatchTooLarge { size: 51, max: 50 }), "{err}");
    assert_eq!(t.likes(ContentType::Reel, "r1").await, 0);
}

#[tokio::test]
async fn test_concurrent_likes_and_unlikes_balance() {
    let t = TestPlaza::new();
    t.seed(ContentType::Post, "p1", "owner").await;
    let ledger = t.services.ledger.clone();

    let mut handles = Vec::new();
    for i in 0..16 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            let actor = format!("fan{i}");
            ledger.like(&actor, ContentType::Post, "p1").await.unwrap();
            if i % 2 == 0 {
                ledger.unlike(&actor, ContentType::Post, "p1").await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let records = ledger
        .likers(ContentType::Post, "p1", Page::new(0, 100))
        .await
        .unwrap();
    assert_eq!(records.len(), 8);
    assert_eq!(t.likes(ContentType::Post, "p1").await, 8);
    assert!(ledger.reconcile(ContentType::Post).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_owner_removal_cascades_to_likes() {
    let t = TestPlaza::new();
    let ledger = &t.services.ledger;
    t.seed(ContentType::UserAsset, "a1", "ana").await;
    ledger.like("ben", ContentType::UserAsset, "a1").await.unwrap();
    ledger.like("cai", ContentType::UserAsset, "a1").await.unwrap();

    let err = ledger
        .remove_content("ben", ContentType::UserAsset, "a1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));

    let purged = ledger
        .remove_content("ana", ContentType::UserAsset, "a1")
        .await
        .unwrap();
    assert_eq!(purged, 2);
    assert!(!ledger.has_liked("ben", ContentType::UserAsset, "a1").await.unwrap());

    let err = ledger.unlike("ben", ContentType::UserAsset, "a1").await.unwrap_err();
    assert!(matches!(err, Error::NotLiked { .. }));
}
