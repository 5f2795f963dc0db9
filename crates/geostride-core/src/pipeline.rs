//! Pipeline orchestrator.
//!
//! [`Pipeline::execute`] runs rate limiting, position lookup, extraction,
//! validation, the security re-check and the position write, and always
//! returns a [`MovementOutcome`]. Every call leaves exactly one audit record.
//!
//! Commands for the same actor are serialized through [`ActorLocks`] from the
//! rate-limit check through the position write. Different actors run
//! concurrently.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::audit::{AttemptContext, AuditCounts, AuditLog, AuditRecord};
use crate::config::PipelineConfig;
use crate::error::{ErrorCode, Result};
use crate::extract::CommandExtractor;
use crate::providers::store::TAIPEI_SPAWN;
use crate::providers::{
    Geocoder, InMemoryPositionStore, MoveSummary, NarrativeGenerator, PositionStore,
    StaticGeocoder, TemplateNarrator,
};
use crate::quota::{UsageQuota, UsageStatus};
use crate::rate_limit::{RateLimitDecision, RateLimitStatus, RateLimiter};
use crate::security::SecurityPolicy;
use crate::types::{ActorId, Coordinate, MovementCommand};
use crate::validate::CommandValidator;

/// Uniform result of one movement attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementOutcome {
    pub success: bool,
    pub message: String,
    pub command: Option<MovementCommand>,
    pub new_position: Option<Coordinate>,
    pub estimated_seconds: Option<u64>,
    pub error_code: Option<ErrorCode>,
    pub rate_limited: bool,
    /// Seconds until the movement window reopens
    pub retry_after_secs: Option<u64>,
    /// Moves left in the current window
    pub remaining_moves: Option<u32>,
    pub ai_usage: Option<UsageStatus>,
    pub audit: AuditRecord,
}

/// Result of a dry run: what the text would do, without doing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementPreview {
    pub current_position: Option<Coordinate>,
    pub command: Option<MovementCommand>,
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
}

/// Per-actor movement statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementStats {
    pub actor_id: ActorId,
    pub rate_limit: Option<RateLimitStatus>,
    pub audit: AuditCounts,
    pub ai_usage: UsageStatus,
}

/// One async mutex per actor
#[derive(Debug, Default)]
pub struct ActorLocks {
    locks: Mutex<HashMap<ActorId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ActorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, actor: &ActorId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(actor.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drop locks nobody holds or waits on
    pub fn sweep(&self) -> usize {
        let mut locks = self.locks.lock();
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

/// Failure on some exit path, turned into an outcome by [`Pipeline::reject`]
struct Rejection {
    command: Option<MovementCommand>,
    code: ErrorCode,
    message: String,
    retry_after_secs: Option<u64>,
}

impl Rejection {
    fn new(command: Option<MovementCommand>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            command,
            code,
            message: message.into(),
            retry_after_secs: None,
        }
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    extractor: CommandExtractor,
    validator: CommandValidator,
    policy: SecurityPolicy,
    rate_limiter: Arc<RateLimiter>,
    quota: Arc<UsageQuota>,
    audit: Arc<AuditLog>,
    locks: Arc<ActorLocks>,
    store: Arc<dyn PositionStore>,
    narrator: Arc<dyn NarrativeGenerator>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn usage_quota(&self) -> &UsageQuota {
        &self.quota
    }

    /// Interpret `text` and move the actor. Never fails; see the outcome's
    /// `error_code`.
    pub async fn execute(
        &self,
        actor: &ActorId,
        text: &str,
        session_id: Option<String>,
        origin_ip: Option<String>,
    ) -> MovementOutcome {
        let attempt = AttemptContext::new(actor.clone(), text, session_id, origin_ip);

        let lock = self.locks.acquire(actor);
        let guard = lock.lock().await;

        let remaining = match self.rate_limiter.check(actor) {
            RateLimitDecision::Allowed { remaining } => remaining,
            RateLimitDecision::Limited { retry_after } => {
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                let mut rejection = Rejection::new(
                    None,
                    ErrorCode::RateLimited,
                    format!(
                        "movement rate limit of {} per {}s reached, retry in {}s",
                        self.rate_limiter.max_requests(),
                        self.rate_limiter.window().as_secs(),
                        secs
                    ),
                );
                rejection.retry_after_secs = Some(secs);
                return self.reject(attempt, rejection);
            }
        };

        let (command, origin, position) = match self.run_checked(actor, text).await {
            Ok(done) => done,
            Err(rejection) => return self.reject(attempt, rejection),
        };

        self.rate_limiter.record_success(actor);
        let record = attempt.succeeded(command.clone());
        self.audit.record(record.clone());
        drop(guard);

        let hop = command.hop_distance_meters.unwrap_or(0.0);
        tracing::info!(
            actor = %actor,
            destination = %position,
            distance_m = hop,
            eta_s = command.estimated_seconds,
            "Movement executed"
        );

        let summary = MoveSummary {
            actor: actor.clone(),
            from: origin,
            to: position,
            distance_meters: hop,
            estimated_seconds: command.estimated_seconds,
        };
        let (message, ai_usage) = self.narrate(actor, &command, &summary).await;

        MovementOutcome {
            success: true,
            message,
            estimated_seconds: Some(command.estimated_seconds),
            command: Some(command),
            new_position: Some(position),
            error_code: None,
            rate_limited: false,
            retry_after_secs: None,
            remaining_moves: Some(remaining.saturating_sub(1)),
            ai_usage,
            audit: record,
        }
    }

    /// Everything between the rate-limit check and success. Returns the
    /// executed command with its origin and destination.
    async fn run_checked(
        &self,
        actor: &ActorId,
        text: &str,
    ) -> std::result::Result<(MovementCommand, Coordinate, Coordinate), Rejection> {
        let current = self.current_position(actor).await?;

        let mut command = self
            .extractor
            .extract(text)
            .await
            .map_err(|e| Rejection::new(None, e.code(), e.to_string()))?;

        if let Err(e) = self.validator.validate(&mut command, Some(current)) {
            let code = e.code();
            return Err(Rejection::new(Some(command), code, e.to_string()));
        }

        let destination = match self.policy.check(&command, current) {
            Ok(destination) => destination,
            Err(violation) => {
                let code = violation.code();
                return Err(Rejection::new(Some(command), code, violation.to_string()));
            }
        };

        let write = tokio::time::timeout(
            self.config.timeouts.store(),
            self.store.set_current(actor, destination),
        )
        .await;
        match write {
            Ok(Ok(())) => Ok((command, current, destination)),
            Ok(Err(e)) => Err(Rejection::new(
                Some(command),
                ErrorCode::ExecutionError,
                e.to_string(),
            )),
            Err(_) => Err(Rejection::new(
                Some(command),
                ErrorCode::ExecutionError,
                format!(
                    "position write timed out after {}ms",
                    self.config.timeouts.store_ms
                ),
            )),
        }
    }

    async fn current_position(
        &self,
        actor: &ActorId,
    ) -> std::result::Result<Coordinate, Rejection> {
        match tokio::time::timeout(self.config.timeouts.store(), self.store.get_current(actor))
            .await
        {
            Ok(Ok(position)) => Ok(position),
            Ok(Err(e)) => Err(Rejection::new(None, ErrorCode::PlayerNotFound, e.to_string())),
            Err(_) => Err(Rejection::new(
                None,
                ErrorCode::PlayerNotFound,
                format!(
                    "position lookup timed out after {}ms",
                    self.config.timeouts.store_ms
                ),
            )),
        }
    }

    fn reject(&self, attempt: AttemptContext, rejection: Rejection) -> MovementOutcome {
        tracing::warn!(
            actor = %attempt.actor_id,
            code = %rejection.code,
            reason = %rejection.message,
            "Movement rejected"
        );

        let record = attempt.failed(
            rejection.command.clone(),
            rejection.code,
            rejection.message.clone(),
        );
        self.audit.record(record.clone());

        MovementOutcome {
            success: false,
            message: rejection.message,
            command: rejection.command,
            new_position: None,
            estimated_seconds: None,
            error_code: Some(rejection.code),
            rate_limited: rejection.code == ErrorCode::RateLimited,
            retry_after_secs: rejection.retry_after_secs,
            remaining_moves: None,
            ai_usage: None,
            audit: record,
        }
    }

    /// Narrative for an executed move. Falls back to the template when the
    /// quota is spent or the narrator fails.
    async fn narrate(
        &self,
        actor: &ActorId,
        command: &MovementCommand,
        summary: &MoveSummary,
    ) -> (String, Option<UsageStatus>) {
        if !self.narrator.uses_ai() {
            return (self.describe_bounded(actor, command, summary).await, None);
        }

        let usage = self.quota.try_consume(actor);
        if !usage.allowed {
            tracing::debug!(actor = %actor, "AI usage quota exhausted, using template");
            return (TemplateNarrator::render(command, summary), Some(usage));
        }

        (self.describe_bounded(actor, command, summary).await, Some(usage))
    }

    /// Narrator call under the narrative timeout, template on failure
    async fn describe_bounded(
        &self,
        actor: &ActorId,
        command: &MovementCommand,
        summary: &MoveSummary,
    ) -> String {
        let described = tokio::time::timeout(
            self.config.timeouts.narrative(),
            self.narrator.describe(command, summary),
        )
        .await;

        match described {
            Ok(Ok(message)) => message,
            Ok(Err(e)) => {
                tracing::warn!(actor = %actor, error = %e, "Narrative generation failed");
                TemplateNarrator::render(command, summary)
            }
            Err(_) => {
                tracing::warn!(actor = %actor, "Narrative generation timed out");
                TemplateNarrator::render(command, summary)
            }
        }
    }

    /// Extract and validate without executing, auditing or touching the
    /// rate limiter
    pub async fn preview(&self, actor: &ActorId, text: &str) -> MovementPreview {
        let current = self.current_position(actor).await.ok();

        let mut command = match self.extractor.extract(text).await {
            Ok(command) => command,
            Err(e) => {
                return MovementPreview {
                    current_position: current,
                    command: None,
                    error_code: Some(e.code()),
                    error_message: Some(e.to_string()),
                }
            }
        };

        let error = self
            .validator
            .validate(&mut command, current)
            .err()
            .map(|e| (e.code(), e.to_string()));

        MovementPreview {
            current_position: current,
            command: Some(command),
            error_code: error.as_ref().map(|(code, _)| *code),
            error_message: error.map(|(_, message)| message),
        }
    }

    pub fn movement_stats(&self, actor: &ActorId) -> MovementStats {
        MovementStats {
            actor_id: actor.clone(),
            rate_limit: self.rate_limiter.status(actor),
            audit: self.audit.counts_for(actor),
            ai_usage: self.quota.usage(actor),
        }
    }

    /// Periodically evict idle rate-limit windows, actor locks and quota
    /// entries
    pub fn spawn_maintenance(&self) -> JoinHandle<()> {
        let rate_limiter = Arc::clone(&self.rate_limiter);
        let locks = Arc::clone(&self.locks);
        let quota = Arc::clone(&self.quota);
        let interval = self.config.rate_limit.sweep_interval();
        let retention = self.config.rate_limit.retention();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let windows = rate_limiter.sweep(retention);
                let idle_locks = locks.sweep();
                let quotas = quota.sweep();
                tracing::debug!(windows, idle_locks, quotas, "Maintenance sweep");
            }
        })
    }
}

pub struct PipelineBuilder {
    config: PipelineConfig,
    geocoder: Option<Arc<dyn Geocoder>>,
    store: Option<Arc<dyn PositionStore>>,
    narrator: Option<Arc<dyn NarrativeGenerator>>,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            config: PipelineConfig::default(),
            geocoder: None,
            store: None,
            narrator: None,
            rate_limiter: None,
        }
    }
}

impl PipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn store(mut self, store: Arc<dyn PositionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn narrator(mut self, narrator: Arc<dyn NarrativeGenerator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    /// Share a limiter owned elsewhere instead of creating one from config
    pub fn rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let config = self.config;
        config.validate()?;

        let geocoder = self
            .geocoder
            .unwrap_or_else(|| Arc::new(StaticGeocoder::taiwan()));
        let store = self.store.unwrap_or_else(|| {
            Arc::new(InMemoryPositionStore::new().with_spawn_point(TAIPEI_SPAWN))
        });
        let narrator = self.narrator.unwrap_or_else(|| Arc::new(TemplateNarrator));
        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| Arc::new(RateLimiter::from_settings(&config.rate_limit)));

        Ok(Pipeline {
            extractor: CommandExtractor::new(geocoder, config.timeouts.geocoder()),
            validator: CommandValidator::new(
                config.bounds,
                config.max_hop_meters,
                config.min_confidence,
            ),
            policy: SecurityPolicy::from_config(&config),
            rate_limiter,
            quota: Arc::new(UsageQuota::from_settings(&config.usage_quota)),
            audit: Arc::new(AuditLog::new(config.audit_max_entries)),
            locks: Arc::new(ActorLocks::new()),
            store,
            narrator,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_actor_locks_are_shared_per_actor() {
        let locks = ActorLocks::new();
        let a1 = locks.acquire(&ActorId::new("a"));
        let a2 = locks.acquire(&ActorId::new("a"));
        assert!(Arc::ptr_eq(&a1, &a2));

        let _held = a1.lock().await;
        assert!(a2.try_lock().is_err());
        assert!(locks.acquire(&ActorId::new("b")).try_lock().is_ok());
    }

    #[test]
    fn test_actor_lock_sweep_keeps_held_locks() {
        let locks = ActorLocks::new();
        let held = locks.acquire(&ActorId::new("a"));
        let _ = locks.acquire(&ActorId::new("b"));

        assert_eq!(locks.sweep(), 1);
        assert_eq!(locks.len(), 1);
        drop(held);
        assert_eq!(locks.sweep(), 1);
        assert!(locks.is_empty());
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = PipelineConfig::new().with_max_hop_meters(-1.0);
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[tokio::test]
    async fn test_preview_does_not_mutate() {
        let store = Arc::new(
            InMemoryPositionStore::new().with_actor("rabbit", TAIPEI_SPAWN),
        );
        let pipeline = Pipeline::builder().store(store.clone()).build().unwrap();
        let actor = ActorId::new("rabbit");

        let preview = pipeline.preview(&actor, "move 200 meters north").await;
        assert!(preview.error_code.is_none());
        assert!(preview.command.unwrap().safety_checked);
        assert_eq!(store.position(&actor), Some(TAIPEI_SPAWN));
        assert!(pipeline.audit_log().is_empty());
        assert!(pipeline.rate_limiter().status(&actor).is_none());
    }
}
