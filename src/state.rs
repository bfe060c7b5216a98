//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - Server configuration
//! - The ingest service
//! - The job registry shared with the service

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::registry::{DashMapRegistry, IngestJob};
use crate::service::VodIngestService;

pub struct AppState {
    pub config: ServerConfig,
    pub service: VodIngestService,
    pub jobs: Arc<DashMapRegistry>,
}

impl AppState {
    /// Create a new AppState; the service stores its jobs in `jobs`.
    pub fn new(config: ServerConfig, jobs: Arc<DashMapRegistry>) -> Result<Self> {
        let service = VodIngestService::new(&config, jobs.clone())?;
        Ok(Self {
            config,
            service,
            jobs,
        })
    }

    /// Cancel and forget a job
    pub fn cancel_job(&self, key: &str) -> Option<IngestJob> {
        let job = self.jobs.remove(key)?;
        job.cancel();
        Some(job)
    }

    /// Signal shutdown: cancel every running job
    pub fn shutdown(&self) {
        let cancelled = self.jobs.cancel_all();
        tracing::info!("Shutdown requested, cancelled {} jobs", cancelled);
    }
}
