//! In-memory position store

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::PositionStore;
use crate::error::StoreError;
use crate::types::{ActorId, Coordinate};

/// Default spawn point for new actors (Taipei City Hall area)
pub const TAIPEI_SPAWN: Coordinate = Coordinate::new(25.0330, 121.5654);

/// Actor positions held in a process-local map.
///
/// With a spawn point configured, an unknown actor is created there on its
/// first lookup; without one it is reported as not found.
#[derive(Debug, Default)]
pub struct InMemoryPositionStore {
    positions: RwLock<HashMap<ActorId, Coordinate>>,
    spawn_point: Option<Coordinate>,
}

impl InMemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spawn_point(mut self, spawn_point: Coordinate) -> Self {
        self.spawn_point = Some(spawn_point);
        self
    }

    pub fn with_actor(self, actor: impl Into<ActorId>, position: Coordinate) -> Self {
        self.positions.write().insert(actor.into(), position);
        self
    }

    /// Current position without spawning
    pub fn position(&self, actor: &ActorId) -> Option<Coordinate> {
        self.positions.read().get(actor).copied()
    }

    pub fn actor_count(&self) -> usize {
        self.positions.read().len()
    }
}

#[async_trait]
impl PositionStore for InMemoryPositionStore {
    async fn get_current(&self, actor: &ActorId) -> Result<Coordinate, StoreError> {
        if let Some(position) = self.position(actor) {
            return Ok(position);
        }

        let spawn = self
            .spawn_point
            .ok_or_else(|| StoreError::NotFound(actor.to_string()))?;

        let position = *self.positions.write().entry(actor.clone()).or_insert(spawn);
        tracing::info!(actor = %actor, position = %position, "Spawned new actor");
        Ok(position)
    }

    async fn set_current(&self, actor: &ActorId, position: Coordinate) -> Result<(), StoreError> {
        if !position.is_finite() {
            return Err(StoreError::Backend(format!(
                "refusing non-finite position {}",
                position
            )));
        }
        self.positions.write().insert(actor.clone(), position);
        Ok(())
    }
}
