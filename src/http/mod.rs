//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with the ingest and job endpoints
//! - Request handlers and their error mapping
//! - CORS and request tracing middleware

pub mod handlers;
pub mod routes;

pub use routes::create_router;
