//! Per-actor movement rate limiter.
//!
//! Fixed window per actor. A check never consumes budget; only
//! [`RateLimiter::record_success`] does, so failed parses are free.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RateLimitSettings;
use crate::types::ActorId;

/// Window state for one actor
#[derive(Debug, Clone)]
struct RateLimitState {
    count: u32,
    window_start: Instant,
    last_seen: Instant,
}

impl RateLimitState {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
            last_seen: now,
        }
    }

    fn is_expired(&self, window: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.window_start) > window
    }

    fn reset(&mut self, now: Instant) {
        self.count = 0;
        self.window_start = now;
    }
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// Snapshot of an actor's window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub count: u32,
    pub max_requests: u32,
    pub window_secs: u64,
    /// Seconds since the window opened
    pub window_age_secs: u64,
    pub remaining: u32,
    /// Seconds until the window resets
    pub resets_in_secs: u64,
}

pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<ActorId, RateLimitState>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.max_requests, settings.window())
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether the actor may move now. Does not consume budget.
    pub fn check(&self, actor: &ActorId) -> RateLimitDecision {
        let now = Instant::now();
        let mut windows = self.windows.write();
        let state = windows
            .entry(actor.clone())
            .or_insert_with(|| RateLimitState::new(now));

        state.last_seen = now;
        if state.is_expired(self.window, now) {
            state.reset(now);
        }

        if state.count < self.max_requests {
            RateLimitDecision::Allowed {
                remaining: self.max_requests - state.count,
            }
        } else {
            let elapsed = now.saturating_duration_since(state.window_start);
            RateLimitDecision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            }
        }
    }

    /// Count an executed move against the actor's window
    pub fn record_success(&self, actor: &ActorId) {
        let now = Instant::now();
        let mut windows = self.windows.write();
        let state = windows
            .entry(actor.clone())
            .or_insert_with(|| RateLimitState::new(now));

        if state.is_expired(self.window, now) {
            state.reset(now);
        }
        state.count += 1;
        state.last_seen = now;
    }

    pub fn status(&self, actor: &ActorId) -> Option<RateLimitStatus> {
        let now = Instant::now();
        let windows = self.windows.read();
        let state = windows.get(actor)?;

        let (count, age) = if state.is_expired(self.window, now) {
            (0, Duration::ZERO)
        } else {
            (state.count, now.saturating_duration_since(state.window_start))
        };

        Some(RateLimitStatus {
            count,
            max_requests: self.max_requests,
            window_secs: self.window.as_secs(),
            window_age_secs: age.as_secs(),
            remaining: self.max_requests.saturating_sub(count),
            resets_in_secs: self.window.saturating_sub(age).as_secs(),
        })
    }

    /// Drop windows of actors idle for longer than `retention`
    pub fn sweep(&self, retention: Duration) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.write();
        let before = windows.len();
        windows.retain(|_, state| now.saturating_duration_since(state.last_seen) <= retention);
        before - windows.len()
    }

    pub fn tracked_actors(&self) -> usize {
        self.windows.read().len()
    }
}
