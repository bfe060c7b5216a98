//! Ingest job handles and the registry that tracks them

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::ingest::{IngestStats, StatsSnapshot};

/// Registry key for an asset episode
pub fn job_key(name: &str, episode: &str) -> String {
    format!("{}EP{}", name, episode)
}

/// Sink for launched jobs. Injected into the ingest service.
pub trait JobRegistry: Send + Sync {
    fn store(&self, key: String, job: IngestJob);
}

/// Handle over one root ingestion task and all of its descendants.
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub id: Uuid,
    pub key: String,
    pub root_url: String,
    pub storage_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    stats: Arc<IngestStats>,
}

/// JSON view of a job
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub key: String,
    pub id: Uuid,
    pub url: String,
    pub dir: String,
    pub started_at: DateTime<Utc>,
    pub finished: bool,
    pub cancelled: bool,
    pub stats: StatsSnapshot,
}

impl IngestJob {
    pub fn new(
        key: String,
        root_url: String,
        storage_dir: PathBuf,
        cancel: CancellationToken,
        tracker: TaskTracker,
        stats: Arc<IngestStats>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            root_url,
            storage_dir,
            started_at: Utc::now(),
            cancel,
            tracker,
            stats,
        }
    }

    /// Cancel the root task; every descendant observes it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait until the root task and every task it spawned have ended.
    /// Only meaningful once the tracker has been closed by the launcher.
    pub async fn wait(&self) {
        self.tracker.wait().await;
    }

    pub fn is_finished(&self) -> bool {
        self.tracker.is_closed() && self.tracker.is_empty()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            key: self.key.clone(),
            id: self.id,
            url: self.root_url.clone(),
            dir: self.storage_dir.display().to_string(),
            started_at: self.started_at,
            finished: self.is_finished(),
            cancelled: self.is_cancelled(),
            stats: self.stats(),
        }
    }
}

/// DashMap-backed registry
#[derive(Debug, Default)]
pub struct DashMapRegistry {
    jobs: DashMap<String, IngestJob>,
}

impl DashMapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<IngestJob> {
        self.jobs.get(key).map(|r| r.clone())
    }

    /// Remove a job without cancelling it
    pub fn remove(&self, key: &str) -> Option<IngestJob> {
        self.jobs.remove(key).map(|(_, job)| job)
    }

    /// All jobs, oldest first
    pub fn jobs(&self) -> Vec<IngestJob> {
        let mut jobs: Vec<IngestJob> = self.jobs.iter().map(|r| r.value().clone()).collect();
        jobs.sort_by_key(|job| job.started_at);
        jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Cancel every registered job. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        for entry in self.jobs.iter() {
            if !entry.is_cancelled() {
                entry.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }
}

impl JobRegistry for DashMapRegistry {
    fn store(&self, key: String, job: IngestJob) {
        if let Some(previous) = self.jobs.insert(key, job) {
            if !previous.is_finished() {
                tracing::info!("Replacing running job {} ({})", previous.key, previous.id);
            }
            previous.cancel();
        }
    }
}
