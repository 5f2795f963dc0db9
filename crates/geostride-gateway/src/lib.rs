//! Geostride Gateway - HTTP surface for the movement pipeline
//!
//! A thin axum layer over [`geostride_core::Pipeline`]. Every movement rule
//! lives in the core crate; this crate only decodes requests, picks the
//! collaborators named in the configuration and maps outcomes to HTTP
//! status codes.
//!
//! # Endpoints
//!
//! ```text
//! POST /move                 execute a text command for an actor
//! POST /debug/parse          dry run, nothing is written or audited
//! GET  /health               liveness
//! GET  /status               version, tracked actors, audit size
//! GET  /actors/:id/stats     rate-limit window, audit counters, AI usage
//! GET  /actors/:id/audit     recent audit records, newest first
//! ```

pub mod config;
pub mod error;
pub mod gateway;

pub use config::{GatewayConfig, GeocoderProvider, NarratorProvider};
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, GatewayState};

/// Gateway version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// Default host
pub const DEFAULT_HOST: &str = "127.0.0.1";
