//! Collaborator contracts consumed by the pipeline, with bundled
//! implementations.
//!
//! The pipeline only depends on the traits. Everything here is swappable at
//! construction time through [`crate::pipeline::PipelineBuilder`].

pub mod geocoder;
pub mod narrative;
pub mod store;

use async_trait::async_trait;

use crate::error::{GeocodeError, NarrativeError, StoreError};
use crate::types::{ActorId, Coordinate, MovementCommand};

pub use geocoder::{GooglePlacesGeocoder, StaticGeocoder};
pub use narrative::{ChatNarrator, TemplateNarrator};
pub use store::InMemoryPositionStore;

/// Resolves a place name to a coordinate
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Provider name, used in logs
    fn name(&self) -> &str;

    async fn resolve(&self, name: &str) -> Result<Coordinate, GeocodeError>;
}

/// Persistence of actor positions
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn get_current(&self, actor: &ActorId) -> Result<Coordinate, StoreError>;

    async fn set_current(&self, actor: &ActorId, position: Coordinate) -> Result<(), StoreError>;
}

/// What an executed move did, handed to the narrator
#[derive(Debug, Clone, PartialEq)]
pub struct MoveSummary {
    pub actor: ActorId,
    pub from: Coordinate,
    pub to: Coordinate,
    pub distance_meters: f64,
    pub estimated_seconds: u64,
}

/// Best-effort natural-language description of an executed move.
///
/// Failures are swallowed by the pipeline, which falls back to
/// [`TemplateNarrator`].
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Whether a call counts against the daily AI-usage quota
    fn uses_ai(&self) -> bool {
        true
    }

    async fn describe(
        &self,
        command: &MovementCommand,
        summary: &MoveSummary,
    ) -> Result<String, NarrativeError>;
}
