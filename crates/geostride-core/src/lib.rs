//! Geostride Core - natural-language movement pipeline for map avatars
//!
//! Turns an untrusted text command ("move 200 meters north", "帶我去高雄", a
//! coordinate pair or a map link) plus the actor's current position into a
//! validated, bounded, rate-limited position update, with an audit record for
//! every attempt.
//!
//! # Architecture
//!
//! ```text
//! execute(actor, text, session, ip)
//!   │
//!   ├─ RateLimiter        per-actor fixed window
//!   ├─ PositionStore      current position (timeout → PLAYER_NOT_FOUND)
//!   ├─ CommandExtractor   gate + strategy cascade (+ Geocoder)
//!   ├─ CommandValidator   projection, geofence, hop ceiling, ETA
//!   ├─ SecurityPolicy     independent re-check before the write
//!   ├─ PositionStore      write (the only mutation)
//!   ├─ NarrativeGenerator best effort, gated by the daily UsageQuota
//!   └─ AuditLog           exactly one record per call
//! ```
//!
//! # Quick Start
//!
//! ```
//! use geostride_core::{ActorId, Pipeline};
//!
//! let pipeline = Pipeline::builder().build().unwrap();
//! let actor = ActorId::new("rabbit");
//!
//! let outcome = tokio_test::block_on(pipeline.execute(&actor, "move 200 meters north", None, None));
//! assert!(outcome.success);
//! assert_eq!(outcome.estimated_seconds, Some(80));
//! ```

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, clippy::all)]

pub mod audit;
pub mod config;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod pipeline;
pub mod providers;
pub mod quota;
pub mod rate_limit;
pub mod security;
pub mod types;
pub mod validate;

pub use audit::{AuditLog, AuditRecord};
pub use config::PipelineConfig;
pub use error::{CoreError, ErrorCode, Result};
pub use extract::CommandExtractor;
pub use geometry::BoundingBox;
pub use pipeline::{MovementOutcome, MovementPreview, MovementStats, Pipeline, PipelineBuilder};
pub use providers::{Geocoder, NarrativeGenerator, PositionStore};
pub use quota::{UsageQuota, UsageStatus};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use security::SecurityPolicy;
pub use types::{ActorId, CommandKind, Coordinate, Direction, MovementCommand, SpeedProfile};
pub use validate::CommandValidator;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
