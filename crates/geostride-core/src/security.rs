//! Pre-execution business-rule re-check.
//!
//! Runs after the validator, right before the position write, and trusts
//! nothing the command carries: the hop distance is recomputed from the
//! actor's position.

use crate::config::PipelineConfig;
use crate::error::SecurityViolation;
use crate::geometry::{haversine_distance, BoundingBox};
use crate::types::{Coordinate, MovementCommand};

#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    max_hop_meters: f64,
    min_confidence: f64,
    restricted_zones: Vec<BoundingBox>,
}

impl SecurityPolicy {
    pub fn new(max_hop_meters: f64, min_confidence: f64) -> Self {
        Self {
            max_hop_meters,
            min_confidence,
            restricted_zones: Vec::new(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_hop_meters: config.max_hop_meters,
            min_confidence: config.security_min_confidence,
            restricted_zones: config.restricted_zones.clone(),
        }
    }

    pub fn with_restricted_zone(mut self, zone: BoundingBox) -> Self {
        self.restricted_zones.push(zone);
        self
    }

    /// Returns the destination the command may be executed against
    pub fn check(
        &self,
        command: &MovementCommand,
        current: Coordinate,
    ) -> Result<Coordinate, SecurityViolation> {
        if !command.safety_checked {
            return Err(SecurityViolation::NotSafetyChecked);
        }

        let destination = command
            .destination
            .ok_or(SecurityViolation::MissingDestination)?;

        let distance = haversine_distance(current, destination);
        if distance.is_nan() || distance > self.max_hop_meters {
            return Err(SecurityViolation::DistanceTooLarge {
                distance,
                max: self.max_hop_meters,
            });
        }

        if command.confidence < self.min_confidence {
            return Err(SecurityViolation::LowConfidence {
                confidence: command.confidence,
                min: self.min_confidence,
            });
        }

        if self
            .restricted_zones
            .iter()
            .any(|zone| zone.contains(destination))
        {
            return Err(SecurityViolation::RestrictedZone(destination));
        }

        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CommandKind;

    const TAIPEI: Coordinate = Coordinate::new(25.0330, 121.5654);

    fn checked(destination: Coordinate, confidence: f64) -> MovementCommand {
        let mut command = MovementCommand::new(CommandKind::AbsoluteMove, "test", confidence);
        command.destination = Some(destination);
        command.safety_checked = true;
        command
    }

    #[test]
    fn test_accepts_checked_command() {
        let policy = SecurityPolicy::new(500_000.0, 0.3);
        let dest = Coordinate::new(25.04, 121.56);
        assert_eq!(policy.check(&checked(dest, 0.9), TAIPEI), Ok(dest));
    }

    #[test]
    fn test_rejects_unchecked_command() {
        let policy = SecurityPolicy::new(500_000.0, 0.3);
        let mut command = checked(TAIPEI, 0.9);
        command.safety_checked = false;
        assert_eq!(
            policy.check(&command, TAIPEI),
            Err(SecurityViolation::NotSafetyChecked)
        );
    }

    #[test]
    fn test_recomputes_distance() {
        let policy = SecurityPolicy::new(1_000.0, 0.3);
        let mut command = checked(Coordinate::new(24.1477, 120.6736), 0.9);
        // a stale hop value must not be trusted
        command.hop_distance_meters = Some(10.0);
        assert!(matches!(
            policy.check(&command, TAIPEI),
            Err(SecurityViolation::DistanceTooLarge { .. })
        ));
    }

    #[test]
    fn test_confidence_floor() {
        let policy = SecurityPolicy::new(500_000.0, 0.3);
        assert!(matches!(
            policy.check(&checked(TAIPEI, 0.2), TAIPEI),
            Err(SecurityViolation::LowConfidence { .. })
        ));
    }

    #[test]
    fn test_restricted_zone() {
        let zone = BoundingBox::new(25.05, 25.02, 121.57, 121.55);
        let policy = SecurityPolicy::new(500_000.0, 0.3).with_restricted_zone(zone);
        assert_eq!(
            policy.check(&checked(TAIPEI, 0.9), TAIPEI),
            Err(SecurityViolation::RestrictedZone(TAIPEI))
        );
    }
}
