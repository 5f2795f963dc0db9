//! Daily AI-usage quota.
//!
//! Distinct from the movement limiter: it gates only the narrative step and
//! never fails a move. Counters reset at local midnight.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::UsageQuotaSettings;
use crate::types::ActorId;

#[derive(Debug, Clone)]
struct DailyUsage {
    day: NaiveDate,
    used: u32,
    last_active: DateTime<Local>,
}

/// Snapshot returned with every consumption attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStatus {
    /// Whether this attempt was granted
    pub allowed: bool,
    pub used: u32,
    pub remaining: u32,
    pub limit: u32,
    pub resets_at: DateTime<Local>,
    pub warn: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

pub struct UsageQuota {
    usage: Mutex<HashMap<ActorId, DailyUsage>>,
    daily_limit: u32,
    warn_ratio: f64,
    idle_retention: ChronoDuration,
}

impl UsageQuota {
    pub fn new(daily_limit: u32, warn_ratio: f64) -> Self {
        Self {
            usage: Mutex::new(HashMap::new()),
            daily_limit,
            warn_ratio,
            idle_retention: ChronoDuration::days(7),
        }
    }

    pub fn from_settings(settings: &UsageQuotaSettings) -> Self {
        let mut quota = Self::new(settings.daily_limit, settings.warn_ratio);
        quota.idle_retention = ChronoDuration::days(settings.idle_retention_days);
        quota
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub fn try_consume(&self, actor: &ActorId) -> UsageStatus {
        self.try_consume_at(actor, Local::now())
    }

    /// Consume one unit if the actor still has budget today
    pub fn try_consume_at(&self, actor: &ActorId, now: DateTime<Local>) -> UsageStatus {
        let today = now.date_naive();
        let mut usage = self.usage.lock();
        let entry = usage.entry(actor.clone()).or_insert_with(|| DailyUsage {
            day: today,
            used: 0,
            last_active: now,
        });

        if entry.day != today {
            entry.day = today;
            entry.used = 0;
        }

        let allowed = entry.used < self.daily_limit;
        if allowed {
            entry.used += 1;
            entry.last_active = now;
        }

        self.snapshot(allowed, entry.used, now)
    }

    pub fn usage(&self, actor: &ActorId) -> UsageStatus {
        self.usage_at(actor, Local::now())
    }

    /// Current usage without consuming
    pub fn usage_at(&self, actor: &ActorId, now: DateTime<Local>) -> UsageStatus {
        let today = now.date_naive();
        let used = self
            .usage
            .lock()
            .get(actor)
            .filter(|entry| entry.day == today)
            .map_or(0, |entry| entry.used);
        self.snapshot(used < self.daily_limit, used, now)
    }

    pub fn should_warn(&self, actor: &ActorId) -> bool {
        self.usage(actor).warn
    }

    /// Forget actors idle beyond the retention horizon
    pub fn sweep(&self) -> usize {
        self.sweep_at(Local::now())
    }

    pub fn sweep_at(&self, now: DateTime<Local>) -> usize {
        let mut usage = self.usage.lock();
        let before = usage.len();
        usage.retain(|_, entry| now.signed_duration_since(entry.last_active) <= self.idle_retention);
        before - usage.len()
    }

    fn snapshot(&self, allowed: bool, used: u32, now: DateTime<Local>) -> UsageStatus {
        let remaining = self.daily_limit.saturating_sub(used);
        let resets_at = next_midnight(now);
        let warn = self.daily_limit == 0
            || f64::from(used) / f64::from(self.daily_limit) >= self.warn_ratio;

        UsageStatus {
            allowed,
            used,
            remaining,
            limit: self.daily_limit,
            resets_at,
            warn,
            notice: notice(remaining, resets_at, now),
        }
    }
}

fn next_midnight(now: DateTime<Local>) -> DateTime<Local> {
    now.date_naive()
        .succ_opt()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .unwrap_or_else(|| now + ChronoDuration::hours(24))
}

/// Friendly reminder once the budget runs low
fn notice(remaining: u32, resets_at: DateTime<Local>, now: DateTime<Local>) -> Option<String> {
    match remaining {
        0 => {
            let wait = resets_at.signed_duration_since(now);
            Some(format!(
                "Daily AI usage exhausted, resets in {} h {} min",
                wait.num_hours(),
                wait.num_minutes() % 60
            ))
        }
        1..=3 => Some(format!("Only {} AI uses left today", remaining)),
        4..=5 => Some(format!("{} AI uses left today", remaining)),
        _ => None,
    }
}
