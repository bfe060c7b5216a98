//! VOD ingest service
//!
//! Entry point used by the HTTP layer: validate a request, build the root
//! ingestion task, register the job and launch it without waiting.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::{PlaylistLayout, ServerConfig};
use crate::error::Result;
use crate::ingest::{IngestContext, IngestionTask, PlaylistFetcher, RetryPolicy};
use crate::registry::{job_key, IngestJob, JobRegistry};

/// Request to mirror one HLS asset episode
#[derive(Debug, Clone, Deserialize)]
pub struct VodIngestRequest {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Episode")]
    pub episode: String,
    #[serde(alias = "Url", alias = "URL")]
    pub url: String,
}

pub struct VodIngestService {
    storage_root: PathBuf,
    fetcher: PlaylistFetcher,
    retry: RetryPolicy,
    layout: PlaylistLayout,
    registry: Arc<dyn JobRegistry>,
}

impl VodIngestService {
    pub fn new(config: &ServerConfig, registry: Arc<dyn JobRegistry>) -> Result<Self> {
        Ok(Self {
            storage_root: PathBuf::from(&config.storage_root),
            fetcher: PlaylistFetcher::new(&config.ingest)?,
            retry: RetryPolicy::from(&config.ingest.retry),
            layout: config.ingest.playlist_layout,
            registry,
        })
    }

    /// Replace the retry policy used for jobs launched from now on.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn storage_root(&self) -> &PathBuf {
        &self.storage_root
    }

    /// Launch an ingest job and return its handle immediately.
    pub async fn ingest_hls(&self, request: &VodIngestRequest) -> Result<IngestJob> {
        self.ingest_with_cancel(request, CancellationToken::new()).await
    }

    /// Like [`ingest_hls`](Self::ingest_hls), with a caller-owned root token.
    /// A token that is already cancelled yields a job that fetches nothing.
    pub async fn ingest_with_cancel(
        &self,
        request: &VodIngestRequest,
        cancel: CancellationToken,
    ) -> Result<IngestJob> {
        let ctx = Arc::new(IngestContext::new(
            self.fetcher.clone(),
            self.retry,
            self.layout,
        ));

        let task = IngestionTask::create(
            Arc::clone(&ctx),
            &cancel,
            &request.name,
            &request.episode,
            &request.url,
            &self.storage_root,
        )
        .await?;

        let key = job_key(&request.name, &request.episode);
        let job = IngestJob::new(
            key.clone(),
            task.target().url.to_string(),
            task.target().storage_dir.clone(),
            cancel,
            ctx.tracker.clone(),
            Arc::clone(&ctx.stats),
        );
        tracing::info!(
            "Starting ingest {} ({}) from {} into {}",
            key,
            job.id,
            job.root_url,
            job.storage_dir.display()
        );

        task.start();
        // Children are spawned from inside tracked tasks, so closing here
        // still lets the tree grow; wait() returns once it drains.
        ctx.tracker.close();

        self.registry.store(key, job.clone());
        Ok(job)
    }
}
