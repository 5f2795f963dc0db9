//! Audit recorder.
//!
//! One immutable [`AuditRecord`] per orchestrated attempt, kept in a bounded
//! in-memory log (oldest drained first) and mirrored as a `tracing` event on
//! the `geostride::audit` target.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::types::{ActorId, MovementCommand};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub actor_id: ActorId,
    pub session_id: Option<String>,
    pub origin_ip: Option<String>,
    pub original_text: String,
    pub parsed_command: Option<MovementCommand>,
    pub parsed_at: DateTime<Utc>,
    /// Set only for successful attempts
    pub executed_at: Option<DateTime<Utc>>,
    pub success: bool,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
}

/// Fields known about an attempt before it is written down
#[derive(Debug, Clone)]
pub struct AttemptContext {
    pub actor_id: ActorId,
    pub session_id: Option<String>,
    pub origin_ip: Option<String>,
    pub original_text: String,
    pub parsed_at: DateTime<Utc>,
}

impl AttemptContext {
    pub fn new(
        actor_id: ActorId,
        original_text: impl Into<String>,
        session_id: Option<String>,
        origin_ip: Option<String>,
    ) -> Self {
        Self {
            actor_id,
            session_id,
            origin_ip,
            original_text: original_text.into(),
            parsed_at: Utc::now(),
        }
    }

    pub fn succeeded(self, command: MovementCommand) -> AuditRecord {
        AuditRecord {
            id: Uuid::new_v4(),
            actor_id: self.actor_id,
            session_id: self.session_id,
            origin_ip: self.origin_ip,
            original_text: self.original_text,
            parsed_command: Some(command),
            parsed_at: self.parsed_at,
            executed_at: Some(Utc::now()),
            success: true,
            error_code: None,
            error_message: None,
        }
    }

    pub fn failed(
        self,
        command: Option<MovementCommand>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> AuditRecord {
        AuditRecord {
            id: Uuid::new_v4(),
            actor_id: self.actor_id,
            session_id: self.session_id,
            origin_ip: self.origin_ip,
            original_text: self.original_text,
            parsed_command: command,
            parsed_at: self.parsed_at,
            executed_at: None,
            success: false,
            error_code: Some(code),
            error_message: Some(message.into()),
        }
    }
}

/// Attempt counters for one actor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditCounts {
    pub attempts: usize,
    pub successes: usize,
}

pub struct AuditLog {
    entries: Arc<RwLock<Vec<AuditRecord>>>,
    max_entries: usize,
}

impl AuditLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            max_entries: max_entries.max(1),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Append a record and emit it as a tracing event
    pub fn record(&self, record: AuditRecord) {
        let code = record.error_code.map(|c| c.as_str()).unwrap_or("OK");
        if record.success {
            tracing::info!(
                target: "geostride::audit",
                id = %record.id,
                actor = %record.actor_id,
                session = record.session_id.as_deref().unwrap_or("-"),
                ip = record.origin_ip.as_deref().unwrap_or("-"),
                code,
                text = %record.original_text,
                "movement executed"
            );
        } else {
            tracing::warn!(
                target: "geostride::audit",
                id = %record.id,
                actor = %record.actor_id,
                session = record.session_id.as_deref().unwrap_or("-"),
                ip = record.origin_ip.as_deref().unwrap_or("-"),
                code,
                text = %record.original_text,
                error = record.error_message.as_deref().unwrap_or(""),
                "movement rejected"
            );
        }

        let mut entries = self.entries.write();
        entries.push(record);

        if entries.len() > self.max_entries {
            let remove_count = entries.len() - self.max_entries;
            entries.drain(0..remove_count);
        }
    }

    /// Most recent records, newest first
    pub fn recent(&self, count: usize) -> Vec<AuditRecord> {
        let entries = self.entries.read();
        entries.iter().rev().take(count).cloned().collect()
    }

    /// Records of one actor, oldest first
    pub fn for_actor(&self, actor: &ActorId) -> Vec<AuditRecord> {
        self.entries
            .read()
            .iter()
            .filter(|record| &record.actor_id == actor)
            .cloned()
            .collect()
    }

    pub fn counts_for(&self, actor: &ActorId) -> AuditCounts {
        self.entries
            .read()
            .iter()
            .filter(|record| &record.actor_id == actor)
            .fold(AuditCounts::default(), |mut counts, record| {
                counts.attempts += 1;
                if record.success {
                    counts.successes += 1;
                }
                counts
            })
    }

    pub fn all(&self) -> Vec<AuditRecord> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
