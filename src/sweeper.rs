//! Periodic story reclamation, independent of request traffic.
//!
//! The [`Sweeper`] runs [`StoryManager::sweep_expired`] on a cron schedule
//! (6 fields, seconds first). Runs never overlap inside one process: a tick
//! that fires while the previous sweep is still going is skipped. Several
//! sweeper processes may still run against the same store, which the
//! reclamation primitive tolerates.

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};

use crate::stories::{StoryManager, SweepReport};

/// Cron-driven runner for the expiry sweep.
#[derive(Clone)]
pub struct Sweeper {
    stories: StoryManager,
    schedule: String,
    running: Arc<tokio::sync::Mutex<()>>,
}

impl Sweeper {
    pub fn new(stories: StoryManager, schedule: impl Into<String>) -> Self {
        Self {
            stories,
            schedule: schedule.into(),
            running: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    /// Runs one sweep now.
    ///
    /// Returns `Ok(None)` without sweeping if another sweep from this
    /// sweeper is still in progress.
    pub async fn run_once(&self) -> crate::Result<Option<SweepReport>> {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("Previous sweep still running, skipping tick");
            return Ok(None);
        };
        self.stories.sweep_expired().await.map(Some)
    }

    /// Schedules sweeps and runs them until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the schedule is not a valid cron expression or
    /// the scheduler fails to start or stop.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow::anyhow!("{e:?}"))
            .context("Failed to create sweep scheduler")?;

        let sweeper = self.clone();
        let job = Job::new_async(self.schedule.as_str(), move |_id, _scheduler| {
            let sweeper = sweeper.clone();
            Box::pin(async move {
                match sweeper.run_once().await {
                    Ok(Some(report)) => debug!(%report, "Scheduled sweep complete"),
                    Ok(None) => {},
                    Err(e) => error!(error = %e, "Scheduled sweep failed"),
                }
            })
        })
        .map_err(|e| anyhow::anyhow!("{e:?}"))
        .with_context(|| format!("Invalid sweep schedule '{}'", self.schedule))?;

        scheduler
            .add(job)
            .await
            .map_err(|e| anyhow::anyhow!("{e:?}"))
            .context("Failed to register sweep job")?;
        scheduler
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("{e:?}"))
            .context("Failed to start sweep scheduler")?;
        info!(schedule = %self.schedule, "Sweeper started");

        shutdown.await;

        info!("Sweeper shutting down");
        scheduler
            .shutdown()
            .await
            .map_err(|e| anyhow::anyhow!("{e:?}"))
            .context("Failed to stop sweep scheduler")?;

        // Let an in-flight sweep finish before returning.
        let _guard = self.running.lock().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::BlobStore;
    use crate::clock::{Clock, ManualClock};
    use crate::ledger::CounterLedger;
    use crate::model::{ReclaimTrigger, StoryTombstone, collections};
    use crate::store::DocumentStore;
    use crate::stories::NewStory;
    use chrono::{TimeDelta, TimeZone, Utc};
    use std::time::Duration;

    fn setup() -> (Sweeper, StoryManager, DocumentStore, ManualClock) {
        let store = DocumentStore::memory();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        let clock_arc: Arc<dyn Clock> = Arc::new(clock.clone());
        let ledger = CounterLedger::new(store.clone(), Arc::clone(&clock_arc));
        let stories = StoryManager::new(store.clone(), BlobStore::memory(), ledger, clock_arc);
        (Sweeper::new(stories.clone(), "* * * * * *"), stories, store, clock)
    }

    fn clip() -> NewStory {
        NewStory {
            media: b"mp4 bytes".to_vec(),
            media_type: "video/mp4".to_string(),
            thumbnail: None,
        }
    }

    #[tokio::test]
    async fn test_run_once_reclaims_expired() {
        let (sweeper, stories, _, clock) = setup();
        let story = stories.publish_story("ana", clip()).await.unwrap();
        stories.publish_story("ana", clip()).await.unwrap();
        clock.advance(TimeDelta::hours(25));

        let report = sweeper.run_once().await.unwrap().unwrap();
        assert_eq!(report.reclaimed, 2);
        assert!(matches!(
            stories.get_story(&story.id).await,
            Err(crate::Error::Gone { .. })
        ));

        let report = sweeper.run_once().await.unwrap().unwrap();
        assert_eq!(report.scanned, 0);
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let (sweeper, stories, _, clock) = setup();
        stories.publish_story("ana", clip()).await.unwrap();
        clock.advance(TimeDelta::hours(25));

        let held = sweeper.running.lock().await;
        assert!(sweeper.run_once().await.unwrap().is_none());
        assert_eq!(stories.count_live_stories("ana").await.unwrap(), 0);
        drop(held);

        let report = sweeper.run_once().await.unwrap().unwrap();
        assert_eq!(report.reclaimed, 1);
    }

    #[tokio::test]
    async fn test_invalid_schedule_is_rejected() {
        let (_, stories, _, _) = setup();
        let sweeper = Sweeper::new(stories, "every five minutes");
        let err = sweeper.run_until(async {}).await.unwrap_err();
        assert!(format!("{err:#}").contains("Invalid sweep schedule"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_scheduled_sweep_runs_until_shutdown() {
        let (sweeper, stories, store, clock) = setup();
        let story = stories.publish_story("ana", clip()).await.unwrap();
        clock.advance(TimeDelta::hours(25));

        sweeper
            .run_until(tokio::time::sleep(Duration::from_millis(2500)))
            .await
            .unwrap();

        let tombstone: StoryTombstone = store
            .get(collections::STORY_TOMBSTONES, &story.id)
            .await
            .unwrap()
            .expect("swept story leaves a tombstone");
        assert_eq!(tombstone.trigger, ReclaimTrigger::Sweep);
        let report = sweeper.run_once().await.unwrap().unwrap();
        assert_eq!(report.scanned, 0);
    }
}
