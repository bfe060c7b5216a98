//! Server configuration

use serde::{Deserialize, Serialize};

/// Backoff strategy between playlist fetch attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay before every retry
    Fixed,
    /// Doubling delay, capped at `max_backoff_ms`
    Exponential,
}

/// Retry configuration for playlist fetch/parse failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts; `None` retries forever
    pub max_attempts: Option<u32>,

    /// Backoff strategy
    pub backoff: BackoffKind,

    /// Delay before the first retry in milliseconds
    pub initial_backoff_ms: u64,

    /// Upper bound for exponential backoff in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            backoff: BackoffKind::Fixed,
            initial_backoff_ms: 2000,
            max_backoff_ms: 60_000,
        }
    }
}

/// How playlist files are named inside an episode directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistLayout {
    /// Root playlist is `index.m3u8`, variant *i* is `index_<i>.m3u8`,
    /// persisted playlists reference the local files.
    Namespaced,
    /// Every playlist is written to `index.m3u8`, URIs untouched.
    Shared,
}

/// Ingest engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Maximum wait for response headers in seconds
    pub response_header_timeout_secs: u64,

    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// User-Agent sent with every request
    pub user_agent: String,

    /// Playlist naming scheme
    pub playlist_layout: PlaylistLayout,

    /// Retry policy for playlist fetches
    pub retry: RetryConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            response_header_timeout_secs: 60,
            connect_timeout_secs: 30,
            user_agent: format!("vod-ingest/{}", env!("CARGO_PKG_VERSION")),
            playlist_layout: PlaylistLayout::Namespaced,
            retry: RetryConfig::default(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Root directory for ingested assets
    pub storage_root: String,

    /// Ingest engine configuration
    pub ingest: IngestConfig,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Emit logs as JSON instead of the human readable format
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            storage_root: "./VOD_DIR".to_string(),
            ingest: IngestConfig::default(),
            cors_enabled: true,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Apply `VOD_DIR` and `PORT` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    /// An unparsable `PORT` keeps the configured port.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("VOD_DIR") {
            self.storage_root = dir;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(e) => tracing::warn!("Ignoring invalid PORT {:?}: {}", port, e),
            }
        }
    }
}
