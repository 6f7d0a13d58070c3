//! Wiring of stores and components from [`Config`].

use anyhow::{Context, Result};
use chrono::TimeDelta;
use std::sync::Arc;
use tracing::info;

use crate::blob::BlobStore;
use crate::clock::{Clock, SystemClock};
use crate::config::{BlobBackendKind, Config, StoreBackend};
use crate::follow::FollowGraph;
use crate::ledger::CounterLedger;
use crate::reliability::RetryConfig;
use crate::store::DocumentStore;
use crate::stories::{StoryManager, StoryOptions};
use crate::sweeper::Sweeper;

/// Every component, sharing one store, one blob store and one clock.
#[derive(Clone)]
pub struct Services {
    pub store: DocumentStore,
    pub blobs: BlobStore,
    pub ledger: CounterLedger,
    pub follows: FollowGraph,
    pub stories: StoryManager,
}

impl Services {
    /// Opens the configured backends and builds the components.
    ///
    /// # Errors
    ///
    /// Returns an error if the document store or blob directory cannot be
    /// opened.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = match config.store.backend {
            StoreBackend::Redb => {
                let path = config.store_path()?;
                info!(path = %path.display(), "Opening document store");
                DocumentStore::file(&path)?
            },
            StoreBackend::Memory => DocumentStore::memory(),
        };

        let blobs = match config.blobs.backend {
            BlobBackendKind::Filesystem => {
                let dir = config.blob_dir()?;
                info!(dir = %dir.display(), "Opening blob store");
                BlobStore::file(&dir)?
            },
            BlobBackendKind::Memory => BlobStore::memory(),
        };

        let options = StoryOptions {
            tombstone_retention: TimeDelta::hours(
                i64::try_from(config.stories.tombstone_retention_hours)
                    .context("stories.tombstone_retention_hours is too large")?,
            ),
            sweep_batch_size: config.stories.sweep_batch_size,
            blob_retry: RetryConfig::quick(),
        };

        Ok(Self::build(store, blobs, Arc::new(SystemClock), config, options))
    }

    /// In-memory services driven by `clock`, with default settings.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::build(
            DocumentStore::memory(),
            BlobStore::memory(),
            clock,
            &Config::default(),
            StoryOptions::default(),
        )
    }

    fn build(
        store: DocumentStore,
        blobs: BlobStore,
        clock: Arc<dyn Clock>,
        config: &Config,
        options: StoryOptions,
    ) -> Self {
        let ledger = CounterLedger::new(store.clone(), Arc::clone(&clock))
            .with_bulk_like_limit(config.engagement.bulk_like_limit);
        let follows = FollowGraph::new(store.clone(), Arc::clone(&clock));
        let stories = StoryManager::new(store.clone(), blobs.clone(), ledger.clone(), clock)
            .with_options(options);
        Self {
            store,
            blobs,
            ledger,
            follows,
            stories,
        }
    }

    /// A sweeper over this instance's stories.
    pub fn sweeper(&self, config: &Config) -> Sweeper {
        Sweeper::new(self.stories.clone(), config.sweeper.schedule.clone())
    }
}
