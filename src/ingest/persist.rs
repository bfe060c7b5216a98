//! Crash-safe persistence of playlists and segments
//!
//! Every artifact is streamed to a temporary file next to `<final>`, flushed,
//! synced and closed, then renamed over `<final>`. A reader never observes a
//! partial file at the final path; the temporary file is removed on any
//! failure before the rename. Each write gets its own temporary name, so
//! concurrent writers of one path never share a file and the last rename wins.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;
use uuid::Uuid;

use super::fetch::PlaylistFetcher;
use super::playlist::{MasterPlaylist, MediaPlaylist};
use crate::error::{IngestError, Result};

/// Suffix shared by every temporary file
pub const TMP_SUFFIX: &str = ".tmp";

/// `<path>.<unique>.tmp`, unique per call
pub fn tmp_path(final_path: &Path) -> PathBuf {
    let mut name = OsString::from(final_path.as_os_str());
    name.push(format!(".{}{}", Uuid::new_v4().simple(), TMP_SUFFIX));
    PathBuf::from(name)
}

/// Stream `chunks` into `final_path` with the tmp+rename protocol.
/// Returns the number of bytes written.
pub async fn write_atomic<S, E>(final_path: &Path, chunks: S) -> io::Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let tmp = tmp_path(final_path);
    let result = write_then_rename(&tmp, final_path, chunks).await;
    if result.is_err() {
        match fs::remove_file(&tmp).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {}", tmp.display(), e),
        }
    }
    result
}

async fn write_then_rename<S, E>(tmp: &Path, final_path: &Path, chunks: S) -> io::Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut file = fs::File::create(tmp).await?;
    let mut written = 0u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(io::Error::other)?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(tmp, final_path).await?;
    Ok(written)
}

/// Write an in-memory buffer with the tmp+rename protocol.
pub async fn write_bytes_atomic(final_path: &Path, data: Vec<u8>) -> io::Result<u64> {
    let chunks = futures::stream::iter([Ok::<_, io::Error>(Bytes::from(data))]);
    write_atomic(final_path, chunks).await
}

/// Download one segment (or init map) to `final_path`.
pub async fn persist_segment(
    fetcher: &PlaylistFetcher,
    url: &Url,
    final_path: &Path,
) -> Result<u64> {
    let segment_error = |reason: String| IngestError::SegmentPersist {
        path: final_path.to_path_buf(),
        reason,
    };

    let response = fetcher
        .open(url)
        .await
        .map_err(|e| segment_error(e.to_string()))?;

    write_atomic(final_path, response.bytes_stream())
        .await
        .map_err(|e| segment_error(e.to_string()))
}

/// Serialize and write a master playlist.
pub async fn persist_master(playlist: &MasterPlaylist, path: &Path) -> Result<u64> {
    let encoded = playlist
        .encode()
        .map_err(|e| playlist_error(path, e))?;
    write_bytes_atomic(path, encoded)
        .await
        .map_err(|e| playlist_error(path, e))
}

/// Serialize and write a media playlist.
pub async fn persist_media(playlist: &MediaPlaylist, path: &Path) -> Result<u64> {
    let encoded = playlist
        .encode()
        .map_err(|e| playlist_error(path, e))?;
    write_bytes_atomic(path, encoded)
        .await
        .map_err(|e| playlist_error(path, e))
}

fn playlist_error(path: &Path, err: io::Error) -> IngestError {
    IngestError::PlaylistPersist {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
