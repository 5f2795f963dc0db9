//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::geometry::BoundingBox;

/// Everything the pipeline needs to decide whether a move is allowed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Operating region
    pub bounds: BoundingBox,

    /// Longest single hop accepted, in meters
    pub max_hop_meters: f64,

    /// Validator confidence floor
    pub min_confidence: f64,

    /// Confidence floor of the pre-execution re-check
    pub security_min_confidence: f64,

    /// Boxes no command may land in
    pub restricted_zones: Vec<BoundingBox>,

    pub rate_limit: RateLimitSettings,

    pub timeouts: TimeoutSettings,

    pub usage_quota: UsageQuotaSettings,

    /// Audit records kept in memory
    pub audit_max_entries: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bounds: BoundingBox::taiwan(),
            max_hop_meters: 500_000.0,
            min_confidence: 0.3,
            security_min_confidence: 0.3,
            restricted_zones: Vec::new(),
            rate_limit: RateLimitSettings::default(),
            timeouts: TimeoutSettings::default(),
            usage_quota: UsageQuotaSettings::default(),
            audit_max_entries: 10_000,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_max_hop_meters(mut self, max_hop_meters: f64) -> Self {
        self.max_hop_meters = max_hop_meters;
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_restricted_zone(mut self, zone: BoundingBox) -> Self {
        self.restricted_zones.push(zone);
        self
    }

    pub fn with_rate_limit(mut self, max_requests: u32, window: Duration) -> Self {
        self.rate_limit.max_requests = max_requests;
        self.rate_limit.window_secs = window.as_secs().max(1);
        self
    }

    pub fn with_daily_quota(mut self, daily_limit: u32) -> Self {
        self.usage_quota.daily_limit = daily_limit;
        self
    }

    pub fn with_audit_max_entries(mut self, max_entries: usize) -> Self {
        self.audit_max_entries = max_entries;
        self
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if !self.bounds.is_well_formed() {
            return Err(CoreError::InvalidConfig(
                "bounds must be finite with south <= north and west <= east".to_string(),
            ));
        }
        if !(self.max_hop_meters.is_finite() && self.max_hop_meters > 0.0) {
            return Err(CoreError::InvalidConfig(
                "max_hop_meters must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("min_confidence", self.min_confidence),
            ("security_min_confidence", self.security_min_confidence),
            ("usage_quota.warn_ratio", self.usage_quota.warn_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CoreError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "rate_limit needs a non-zero budget and window".to_string(),
            ));
        }
        if self.restricted_zones.iter().any(|zone| !zone.is_well_formed()) {
            return Err(CoreError::InvalidConfig(
                "restricted zones must be well-formed boxes".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from JSON, or TOML when the extension is `.toml`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = if is_toml(path) {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_toml(path) {
            toml::to_string_pretty(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"))
}

/// Per-actor movement frequency limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Moves allowed per window
    pub max_requests: u32,

    pub window_secs: u64,

    /// Idle windows older than this are evicted
    pub retention_secs: u64,

    /// How often the maintenance task runs
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
            retention_secs: 600,
            sweep_interval_secs: 300,
        }
    }
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Bounds on collaborator calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub geocoder_ms: u64,
    pub store_ms: u64,
    pub narrative_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            geocoder_ms: 10_000,
            store_ms: 5_000,
            narrative_ms: 30_000,
        }
    }
}

impl TimeoutSettings {
    pub fn geocoder(&self) -> Duration {
        Duration::from_millis(self.geocoder_ms)
    }

    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }

    pub fn narrative(&self) -> Duration {
        Duration::from_millis(self.narrative_ms)
    }
}

/// Daily AI-usage quota gating narrative generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageQuotaSettings {
    pub daily_limit: u32,

    /// Fraction of the quota after which callers are warned
    pub warn_ratio: f64,

    /// Actors idle for longer than this are forgotten
    pub idle_retention_days: i64,
}

impl Default for UsageQuotaSettings {
    fn default() -> Self {
        Self {
            daily_limit: 15,
            warn_ratio: 0.8,
            idle_retention_days: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.bounds, BoundingBox::taiwan());
        assert_eq!(config.max_hop_meters, 500_000.0);
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
        assert_eq!(config.usage_quota.daily_limit, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::new()
            .with_max_hop_meters(50_000.0)
            .with_rate_limit(2, Duration::from_secs(1))
            .with_restricted_zone(BoundingBox::new(25.1, 25.0, 121.6, 121.5));

        assert_eq!(config.max_hop_meters, 50_000.0);
        assert_eq!(config.rate_limit.max_requests, 2);
        assert_eq!(config.restricted_zones.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig::new().with_min_confidence(1.5);
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));

        let inverted = PipelineConfig::new().with_bounds(BoundingBox::new(21.0, 25.0, 122.0, 120.0));
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"max_hop_meters": 50000.0, "rate_limit": {"max_requests": 3}}"#)
                .unwrap();
        assert_eq!(config.max_hop_meters, 50_000.0);
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.bounds, BoundingBox::taiwan());
    }

    #[test]
    fn test_file_round_trip_json_and_toml() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new()
            .with_daily_quota(20)
            .with_restricted_zone(BoundingBox::new(25.1, 25.0, 121.6, 121.5));

        for name in ["pipeline.json", "pipeline.toml"] {
            let path = dir.path().join(name);
            config.to_file(&path).unwrap();
            assert_eq!(PipelineConfig::from_file(&path).unwrap(), config);
        }
    }
}
