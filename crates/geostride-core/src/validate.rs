//! Command validator: projection, geofence, hop ceiling, confidence floor
//! and ETA.

use crate::error::ValidationError;
use crate::geometry::{haversine_distance, project, BoundingBox};
use crate::types::{CommandKind, Coordinate, MovementCommand};

#[derive(Debug, Clone)]
pub struct CommandValidator {
    bounds: BoundingBox,
    max_hop_meters: f64,
    min_confidence: f64,
}

impl CommandValidator {
    pub fn new(bounds: BoundingBox, max_hop_meters: f64, min_confidence: f64) -> Self {
        Self {
            bounds,
            max_hop_meters,
            min_confidence,
        }
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn max_hop_meters(&self) -> f64 {
        self.max_hop_meters
    }

    /// Finalize a command in place.
    ///
    /// On success the command has a destination, `safety_checked` is set and
    /// `estimated_seconds` is filled in. On failure `safety_checked` stays
    /// false.
    pub fn validate(
        &self,
        command: &mut MovementCommand,
        current: Option<Coordinate>,
    ) -> Result<(), ValidationError> {
        command.safety_checked = false;

        if command.kind == CommandKind::DirectionMove {
            if let (Some(origin), Some(direction)) = (current, command.direction) {
                command.destination = Some(project(origin, direction, command.distance_meters));
            }
        }

        let destination = command
            .destination
            .filter(Coordinate::is_finite)
            .ok_or(ValidationError::MissingDestination)?;

        if !self.bounds.contains(destination) {
            return Err(ValidationError::OutOfBounds(destination));
        }

        let distance = match current {
            Some(origin) => {
                let distance = haversine_distance(origin, destination);
                if distance > self.max_hop_meters {
                    return Err(ValidationError::DistanceTooLarge {
                        distance,
                        max: self.max_hop_meters,
                    });
                }
                command.hop_distance_meters = Some(distance);
                distance
            }
            None => 0.0,
        };

        if command.confidence < self.min_confidence {
            return Err(ValidationError::LowConfidence {
                confidence: command.confidence,
                min: self.min_confidence,
            });
        }

        command.estimated_seconds = (distance / command.speed_profile.meters_per_second()) as u64;
        command.safety_checked = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::types::{Direction, SpeedProfile};

    const TAIPEI: Coordinate = Coordinate::new(25.0330, 121.5654);

    fn validator() -> CommandValidator {
        CommandValidator::new(BoundingBox::taiwan(), 500_000.0, 0.3)
    }

    fn absolute(destination: Coordinate) -> MovementCommand {
        let mut command = MovementCommand::new(CommandKind::AbsoluteMove, "test", 0.9);
        command.destination = Some(destination);
        command
    }

    #[test]
    fn test_direction_move_projected_from_current() {
        let mut command = MovementCommand::new(CommandKind::DirectionMove, "move 200 meters north", 0.8);
        command.direction = Some(Direction::North);
        command.distance_meters = 200.0;

        validator().validate(&mut command, Some(TAIPEI)).unwrap();

        let destination = command.destination.unwrap();
        assert!((destination.latitude - (25.0330 + 200.0 / 111_000.0)).abs() < 1e-9);
        assert_eq!(destination.longitude, TAIPEI.longitude);
        assert!(command.safety_checked);
        assert_eq!(command.estimated_seconds, 80);
    }

    #[test]
    fn test_direction_move_without_position_has_no_destination() {
        let mut command = MovementCommand::new(CommandKind::DirectionMove, "go north", 0.7);
        command.direction = Some(Direction::North);
        command.distance_meters = 100.0;

        let err = validator().validate(&mut command, None).unwrap_err();
        assert_eq!(err, ValidationError::MissingDestination);
        assert_eq!(err.code(), ErrorCode::ParseError);
        assert!(!command.safety_checked);
    }

    #[test]
    fn test_out_of_bounds() {
        let tokyo = Coordinate::new(35.6762, 139.6503);
        let err = validator().validate(&mut absolute(tokyo), Some(TAIPEI)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::OutOfBounds);
    }

    #[test]
    fn test_whole_region_hop_is_allowed() {
        // north-west corner to south-east corner
        let mut command = absolute(Coordinate::new(21.8, 122.2));
        let from = Coordinate::new(25.5, 119.8);
        validator().validate(&mut command, Some(from)).unwrap();
        assert!(command.hop_distance_meters.unwrap() < 500_000.0);
    }

    #[test]
    fn test_distance_too_large() {
        let offshore = Coordinate::new(19.9, 121.0);
        let mut command = absolute(Coordinate::new(25.3, 121.0));
        let err = validator().validate(&mut command, Some(offshore)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DistanceTooLarge);
        assert!(!command.safety_checked);
    }

    #[test]
    fn test_low_confidence() {
        let mut command = absolute(TAIPEI);
        command.confidence = 0.1;
        let err = validator().validate(&mut command, Some(TAIPEI)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::LowConfidence);
    }

    #[test]
    fn test_eta_follows_speed_profile() {
        let destination = project(TAIPEI, Direction::East, 1_000.0);
        let mut command = absolute(destination);
        command.speed_profile = SpeedProfile::Slow;
        validator().validate(&mut command, Some(TAIPEI)).unwrap();

        let distance = command.hop_distance_meters.unwrap();
        assert_eq!(command.estimated_seconds, distance as u64);
    }

    #[test]
    fn test_unknown_position_skips_distance() {
        let mut command = absolute(TAIPEI);
        validator().validate(&mut command, None).unwrap();
        assert_eq!(command.estimated_seconds, 0);
        assert!(command.hop_distance_meters.is_none());
    }
}
