//! Ingestion targets and the on-disk layout they map to

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::PlaylistLayout;
use crate::error::{IngestError, Result};

/// File name of the root playlist of every episode directory
pub const ROOT_PLAYLIST_NAME: &str = "index.m3u8";

/// One unit of work: a playlist URL plus everything inherited from the parent.
#[derive(Debug, Clone)]
pub struct IngestionTarget {
    pub url: Url,
    /// URL of the playlist the job was started with
    pub root_url: Url,
    pub name: String,
    pub episode: String,
    pub storage_root: PathBuf,
    /// `storage_root/name/episode`, shared by the whole task tree
    pub storage_dir: PathBuf,
    /// File name (relative to `storage_dir`) this task's playlist is written to
    pub playlist_name: String,
    pub cancel: CancellationToken,
}

impl IngestionTarget {
    /// Validate inputs and ensure the storage directory exists.
    pub async fn new(
        parent: &CancellationToken,
        name: &str,
        episode: &str,
        playlist_url: &str,
        storage_root: &Path,
    ) -> Result<Self> {
        let url = parse_playlist_url(playlist_url)?;
        check_component("name", name)?;
        check_component("episode", episode)?;

        let storage_dir = storage_dir(storage_root, name, episode);
        tokio::fs::create_dir_all(&storage_dir)
            .await
            .map_err(|source| IngestError::Directory {
                path: storage_dir.clone(),
                source,
            })?;

        Ok(Self {
            root_url: url.clone(),
            url,
            name: name.to_string(),
            episode: episode.to_string(),
            storage_root: storage_root.to_path_buf(),
            storage_dir,
            playlist_name: ROOT_PLAYLIST_NAME.to_string(),
            cancel: parent.child_token(),
        })
    }

    /// Target for a variant of this (master) playlist. Only the URL and the
    /// playlist file name differ; the cancellation token is a child token.
    pub fn child(&self, url: Url, playlist_name: String) -> Self {
        Self {
            url,
            root_url: self.root_url.clone(),
            name: self.name.clone(),
            episode: self.episode.clone(),
            storage_root: self.storage_root.clone(),
            storage_dir: self.storage_dir.clone(),
            playlist_name,
            cancel: self.cancel.child_token(),
        }
    }

    pub fn playlist_path(&self) -> PathBuf {
        self.storage_dir.join(&self.playlist_name)
    }

    /// Resolve a (possibly relative) URI against this target's playlist URL.
    pub fn resolve(&self, uri: &str) -> Result<Url> {
        self.url
            .join(uri)
            .map_err(|e| IngestError::InvalidUrl(format!("{} (relative to {}): {}", uri, self.url, e)))
    }

    /// Where an artifact referenced by this playlist is stored, relative to
    /// `storage_dir`.
    ///
    /// `Shared` keeps the URI as written. `Namespaced` places the artifact by
    /// its resolved URL relative to the root playlist's directory, so sibling
    /// variants that reuse file names (`720p/seg0.ts`, `480p/seg0.ts`) keep
    /// apart. Off-origin URLs land under their host name, and URLs outside the
    /// root directory under their full path.
    pub fn local_path(&self, layout: PlaylistLayout, uri: &str) -> Option<String> {
        if layout == PlaylistLayout::Shared {
            return artifact_path(uri);
        }
        let url = self.resolve(uri).ok()?;
        if url.origin() != self.root_url.origin() {
            let host = url.host_str().filter(|h| !h.is_empty())?;
            return artifact_path(&format!("{}/{}", host, url.path()));
        }
        let root_path = self.root_url.path();
        let root_dir = &root_path[..root_path.rfind('/').map_or(0, |i| i + 1)];
        match url.path().strip_prefix(root_dir) {
            Some(rest) => artifact_path(rest),
            None => artifact_path(url.path()),
        }
    }
}

/// `storage_root/name/episode`
pub fn storage_dir(storage_root: &Path, name: &str, episode: &str) -> PathBuf {
    storage_root.join(name).join(episode)
}

/// Playlist file name for the child spawned for variant `index`.
pub fn variant_playlist_name(layout: PlaylistLayout, index: usize) -> String {
    match layout {
        PlaylistLayout::Namespaced => format!("index_{}.m3u8", index),
        PlaylistLayout::Shared => ROOT_PLAYLIST_NAME.to_string(),
    }
}

/// Local path, relative to the storage directory, for an artifact URI.
///
/// Absolute URLs contribute only their path. Query strings, fragments,
/// empty and `.` components are dropped and `..` never climbs above the
/// storage directory. Returns `None` when nothing usable is left.
pub fn artifact_path(uri: &str) -> Option<String> {
    let path = match Url::parse(uri) {
        Ok(absolute) => absolute.path().to_string(),
        Err(_) => uri
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn parse_playlist_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| IngestError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(IngestError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            raw, other
        ))),
    }
}

fn check_component(field: &str, value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if invalid {
        return Err(IngestError::InvalidAsset(format!(
            "{} {:?} is not a valid directory name",
            field, value
        )));
    }
    Ok(())
}
