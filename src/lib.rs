//! HLS VOD ingest
//!
//! Mirrors a remote HLS presentation (master playlist, variant playlists,
//! init maps and segments) into `storage_root/name/episode` on local disk.
//! Ingests are launched through [`service::VodIngestService`] and tracked in
//! a [`registry::JobRegistry`].

pub mod config;
pub mod config_file;
pub mod error;
pub mod http;
pub mod ingest;
pub mod registry;
pub mod service;
pub mod state;
