//! Ingestion task: fetch, classify, then persist or fan out
//!
//! One task exists per playlist node. A master playlist spawns one child task
//! per variant reference and returns without waiting for them; a media
//! playlist persists itself and then its segments, one at a time, in order.

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::fetch::PlaylistFetcher;
use super::persist::{persist_master, persist_media, persist_segment};
use super::playlist::{MasterPlaylist, MediaPlaylist, Playlist};
use super::retry::RetryPolicy;
use super::stats::IngestStats;
use super::target::{variant_playlist_name, IngestionTarget};
use crate::config::PlaylistLayout;
use crate::error::{IngestError, Result};

/// Everything a task tree shares: the HTTP client, the policies and the
/// tracker/counters of the job it belongs to.
#[derive(Debug)]
pub struct IngestContext {
    pub fetcher: PlaylistFetcher,
    pub retry: RetryPolicy,
    pub layout: PlaylistLayout,
    pub tracker: TaskTracker,
    pub stats: Arc<IngestStats>,
}

impl IngestContext {
    pub fn new(fetcher: PlaylistFetcher, retry: RetryPolicy, layout: PlaylistLayout) -> Self {
        Self {
            fetcher,
            retry,
            layout,
            tracker: TaskTracker::new(),
            stats: Arc::new(IngestStats::default()),
        }
    }
}

/// How a single task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Cancelled,
    /// The retry policy ran out before a playlist could be fetched
    GaveUp { attempts: u32 },
    Master { children: usize },
    Media { written: usize, failed: usize },
}

pub struct IngestionTask {
    target: IngestionTarget,
    ctx: Arc<IngestContext>,
}

impl IngestionTask {
    /// Validate the URL, create `storage_root/name/episode` and build the
    /// root task of a tree. Nothing is fetched until [`start`] or [`run`].
    ///
    /// [`start`]: IngestionTask::start
    /// [`run`]: IngestionTask::run
    pub async fn create(
        ctx: Arc<IngestContext>,
        parent: &CancellationToken,
        name: &str,
        episode: &str,
        playlist_url: &str,
        storage_root: &Path,
    ) -> Result<Self> {
        let target = IngestionTarget::new(parent, name, episode, playlist_url, storage_root).await?;
        Ok(Self { target, ctx })
    }

    pub fn target(&self) -> &IngestionTarget {
        &self.target
    }

    /// Spawn the task on the job's tracker and return immediately.
    pub fn start(self) -> JoinHandle<TaskOutcome> {
        let span = info_span!(
            "ingest",
            name = %self.target.name,
            episode = %self.target.episode,
            url = %self.target.url,
        );
        let tracker = self.ctx.tracker.clone();
        tracker.spawn(self.run().instrument(span))
    }

    /// Retry loop. Cancellation is checked before each attempt and ends a
    /// pending backoff early; an in-flight fetch is never interrupted.
    pub async fn run(self) -> TaskOutcome {
        let mut failures = 0u32;
        loop {
            if self.target.cancel.is_cancelled() {
                debug!("Ingest task cancelled before fetching {}", self.target.url);
                return TaskOutcome::Cancelled;
            }

            match self.fetch_playlist().await {
                Ok(Playlist::Master(master)) => return self.ingest_master(master).await,
                Ok(Playlist::Media(media)) => return self.ingest_media(media).await,
                Err(err) => {
                    failures += 1;
                    self.ctx.stats.record_fetch_failure();

                    let next = if err.is_retryable() {
                        self.ctx.retry.next_delay(failures)
                    } else {
                        None
                    };
                    let Some(delay) = next else {
                        error!(attempts = failures, error = %err, "Giving up on playlist");
                        return TaskOutcome::GaveUp { attempts: failures };
                    };
                    warn!(attempt = failures, wait = ?delay, error = %err, "Playlist fetch failed, retrying");

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.target.cancel.cancelled() => {}
                    }
                }
            }
        }
    }

    async fn fetch_playlist(&self) -> Result<Playlist> {
        let bytes = self.ctx.fetcher.fetch(&self.target.url).await?;
        let playlist = Playlist::classify(&bytes).map_err(|e| IngestError::Parse {
            url: self.target.url.to_string(),
            reason: e.to_string(),
        })?;
        debug!("Fetched {} playlist ({} bytes)", playlist.kind(), bytes.len());
        Ok(playlist)
    }

    async fn ingest_master(&self, mut master: MasterPlaylist) -> TaskOutcome {
        let variants = master.variants();
        info!("Master playlist detected ({} variants)", variants.len());

        let mut spawned = vec![false; variants.len()];
        for (index, variant) in variants.iter().enumerate() {
            let url = match self.target.resolve(&variant.uri) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Skipping variant {}: {}", index, e);
                    continue;
                }
            };
            let playlist_name = variant_playlist_name(self.ctx.layout, index);
            let target = self.target.child(url, playlist_name);
            debug!(variant = index, kind = ?variant.kind, "Spawning variant task for {}", target.url);
            let child = IngestionTask {
                target,
                ctx: Arc::clone(&self.ctx),
            };
            child.start();
            self.ctx.stats.record_child();
            spawned[index] = true;
        }
        let children = spawned.iter().filter(|s| **s).count();

        // Skipped variants keep their original URI.
        if self.ctx.layout == PlaylistLayout::Namespaced {
            master.rewrite_uris(|index, uri| {
                if spawned.get(index).copied().unwrap_or(false) {
                    variant_playlist_name(PlaylistLayout::Namespaced, index)
                } else {
                    uri.to_string()
                }
            });
        }
        let path = self.target.playlist_path();
        match persist_master(&master, &path).await {
            Ok(_) => {
                self.ctx.stats.record_playlist(true);
                info!("Saved master playlist: {}", path.display());
            }
            Err(e) => {
                self.ctx.stats.record_playlist(false);
                error!("{}", e);
            }
        }

        TaskOutcome::Master { children }
    }

    async fn ingest_media(&self, mut media: MediaPlaylist) -> TaskOutcome {
        let segments = media.segments();
        let maps = media.init_maps();
        let total_secs: f32 = segments.iter().map(|s| s.duration).sum();
        info!(
            "Media playlist detected ({} segments, {:.1}s, {} init maps)",
            segments.len(),
            total_secs,
            maps.len()
        );

        if self.ctx.layout == PlaylistLayout::Namespaced {
            media.rewrite_uris(|uri| {
                self.target
                    .local_path(PlaylistLayout::Namespaced, uri)
                    .unwrap_or_else(|| uri.to_string())
            });
        }
        let path = self.target.playlist_path();
        match persist_media(&media, &path).await {
            Ok(_) => {
                self.ctx.stats.record_playlist(true);
                info!("Saved media playlist: {}", path.display());
            }
            Err(e) => {
                self.ctx.stats.record_playlist(false);
                error!("{}", e);
            }
        }

        let mut written = 0;
        let mut failed = 0;
        let uris = maps.iter().chain(segments.iter().map(|s| &s.uri));
        for uri in uris {
            if self.target.cancel.is_cancelled() {
                info!("Cancelled after {} of {} segments", written + failed, segments.len() + maps.len());
                break;
            }
            match self.persist_artifact(uri).await {
                Ok(bytes) => {
                    written += 1;
                    self.ctx.stats.record_segment(bytes);
                }
                Err(e) => {
                    failed += 1;
                    self.ctx.stats.record_segment_failure();
                    warn!("{}", e);
                }
            }
        }

        info!(written, failed, "Media playlist done");
        TaskOutcome::Media { written, failed }
    }

    async fn persist_artifact(&self, uri: &str) -> Result<u64> {
        let relative = self
            .target
            .local_path(self.ctx.layout, uri)
            .ok_or_else(|| IngestError::SegmentPersist {
                path: self.target.storage_dir.clone(),
                reason: format!("no usable file path in URI {:?}", uri),
            })?;
        let final_path = self.target.storage_dir.join(relative);
        let url = self
            .target
            .resolve(uri)
            .map_err(|e| IngestError::SegmentPersist {
                path: final_path.clone(),
                reason: e.to_string(),
            })?;
        persist_segment(&self.ctx.fetcher, &url, &final_path).await
    }
}
