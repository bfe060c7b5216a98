//! HLS ingestion engine
//!
//! This module mirrors a remote HLS presentation to local storage:
//! - Playlist fetching with a bounded header wait
//! - Master/media classification and URI rewriting
//! - One task per playlist node, fanned out from the master
//! - Crash-safe (tmp + rename) persistence of playlists and segments
//! - Retry with fixed or exponential backoff

pub mod fetch;
pub mod persist;
pub mod playlist;
pub mod retry;
pub mod stats;
pub mod target;
pub mod task;

pub use fetch::PlaylistFetcher;
pub use retry::{Backoff, RetryPolicy};
pub use stats::{IngestStats, StatsSnapshot};
pub use target::IngestionTarget;
pub use task::{IngestContext, IngestionTask, TaskOutcome};
