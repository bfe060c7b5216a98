//! Configuration file support
//!
//! Loads server configuration from TOML files.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{BackoffKind, IngestConfig, PlaylistLayout, RetryConfig, ServerConfig};
use crate::error::{IngestError, Result};

/// Configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: ServerSettings,
    /// Storage settings
    pub storage: StorageSettings,
    /// Ingest settings
    pub ingest: Option<IngestSettings>,
    /// Retry settings
    pub retry: Option<RetrySettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Enable CORS
    pub cors_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Root directory for ingested assets
    pub root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Maximum wait for response headers in seconds
    pub response_header_timeout_secs: Option<u64>,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: Option<u64>,
    /// User-Agent header
    pub user_agent: Option<String>,
    /// Playlist layout (namespaced, shared)
    pub playlist_layout: Option<PlaylistLayout>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum attempts, omit to retry forever
    pub max_attempts: Option<u32>,
    /// Backoff strategy (fixed, exponential)
    pub backoff: Option<BackoffKind>,
    /// First delay in milliseconds
    pub initial_backoff_ms: Option<u64>,
    /// Exponential cap in milliseconds
    pub max_backoff_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| IngestError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| IngestError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let retry = RetryConfig::default();
        let ingest = IngestConfig::default();
        Self {
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 8080,
                cors_enabled: Some(true),
            },
            storage: StorageSettings {
                root: "./VOD_DIR".to_string(),
            },
            ingest: Some(IngestSettings {
                response_header_timeout_secs: Some(ingest.response_header_timeout_secs),
                connect_timeout_secs: Some(ingest.connect_timeout_secs),
                user_agent: None,
                playlist_layout: Some(ingest.playlist_layout),
            }),
            retry: Some(RetrySettings {
                max_attempts: retry.max_attempts,
                backoff: Some(retry.backoff),
                initial_backoff_ms: Some(retry.initial_backoff_ms),
                max_backoff_ms: Some(retry.max_backoff_ms),
            }),
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Convert to ServerConfig
    pub fn into_server_config(self) -> ServerConfig {
        let defaults = IngestConfig::default();
        let ingest = self.ingest.as_ref();
        let retry_defaults = RetryConfig::default();
        let retry = match self.retry {
            Some(r) => RetryConfig {
                max_attempts: r.max_attempts,
                backoff: r.backoff.unwrap_or(retry_defaults.backoff),
                initial_backoff_ms: r
                    .initial_backoff_ms
                    .unwrap_or(retry_defaults.initial_backoff_ms),
                max_backoff_ms: r.max_backoff_ms.unwrap_or(retry_defaults.max_backoff_ms),
            },
            None => retry_defaults,
        };

        let (log_level, log_json) = match self.logging {
            Some(l) => (l.level, l.format.as_deref() == Some("json")),
            None => ("info".to_string(), false),
        };

        ServerConfig {
            host: self.server.host,
            port: self.server.port,
            storage_root: self.storage.root,
            ingest: IngestConfig {
                response_header_timeout_secs: ingest
                    .and_then(|i| i.response_header_timeout_secs)
                    .unwrap_or(defaults.response_header_timeout_secs),
                connect_timeout_secs: ingest
                    .and_then(|i| i.connect_timeout_secs)
                    .unwrap_or(defaults.connect_timeout_secs),
                user_agent: ingest
                    .and_then(|i| i.user_agent.clone())
                    .unwrap_or(defaults.user_agent),
                playlist_layout: ingest
                    .and_then(|i| i.playlist_layout)
                    .unwrap_or(defaults.playlist_layout),
                retry,
            },
            cors_enabled: self.server.cors_enabled.unwrap_or(true),
            log_level,
            log_json,
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    ConfigFile::default_config().to_file(path)
}
