//! Per-job counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct IngestStats {
    children_spawned: AtomicU64,
    fetch_failures: AtomicU64,
    playlists_written: AtomicU64,
    playlists_failed: AtomicU64,
    segments_written: AtomicU64,
    segments_failed: AtomicU64,
    bytes_written: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub children_spawned: u64,
    pub fetch_failures: u64,
    pub playlists_written: u64,
    pub playlists_failed: u64,
    pub segments_written: u64,
    pub segments_failed: u64,
    pub bytes_written: u64,
}

impl IngestStats {
    pub fn record_child(&self) {
        self.children_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_playlist(&self, ok: bool) {
        if ok {
            self.playlists_written.fetch_add(1, Ordering::Relaxed);
        } else {
            self.playlists_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_segment(&self, bytes: u64) {
        self.segments_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_segment_failure(&self) {
        self.segments_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            children_spawned: self.children_spawned.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            playlists_written: self.playlists_written.load(Ordering::Relaxed),
            playlists_failed: self.playlists_failed.load(Ordering::Relaxed),
            segments_written: self.segments_written.load(Ordering::Relaxed),
            segments_failed: self.segments_failed.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}
