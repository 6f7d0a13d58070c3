//! Shared harness for plaza integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use plaza::clock::ManualClock;
use plaza::model::{ContentItem, ContentType, Profile, collections};
use plaza::services::Services;
use plaza::stories::NewStory;
use plaza::store::DocumentStore;

/// In-memory services driven by a manual clock.
pub struct TestPlaza {
    pub services: Services,
    pub clock: ManualClock,
}

impl TestPlaza {
    pub fn new() -> Self {
        let clock = ManualClock::new(start_time());
        let services = Services::in_memory(Arc::new(clock.clone()));
        Self { services, clock }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.services.store
    }

    /// Seeds an engageable item owned by `owner`.
    pub async fn seed(&self, content_type: ContentType, id: &str, owner: &str) {
        let item = ContentItem::new(id, owner, self.clock_now());
        let inserted = self
            .store()
            .insert(content_type.collection(), id, &item)
            .await
            .unwrap();
        assert!(inserted, "seeded {content_type} '{id}' twice");
    }

    pub async fn likes(&self, content_type: ContentType, id: &str) -> i64 {
        let doc = self
            .store()
            .get_raw(content_type.collection(), id)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("{content_type} '{id}' missing"));
        doc["likes_count"].as_i64().unwrap_or(0)
    }

    pub async fn profile(&self, actor: &str) -> Profile {
        self.store()
            .get(collections::PROFILES, actor)
            .await
            .unwrap()
            .unwrap_or_else(|| Profile::new(actor))
    }

    fn clock_now(&self) -> DateTime<Utc> {
        use plaza::clock::Clock;
        self.clock.now()
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

pub fn photo() -> NewStory {
    NewStory {
        media: vec![0xFF, 0xD8, 0xFF, 0xE0],
        media_type: "image/jpeg".to_string(),
        thumbnail: Some(vec![0xFF, 0xD8]),
    }
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}
