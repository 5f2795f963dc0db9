//! Command classifier and extractor.
//!
//! Two steps: a cheap vocabulary gate rejects text that cannot be a movement
//! command, then the ordered [`strategies::STRATEGIES`] cascade produces one
//! candidate. Place names go through the [`Geocoder`] under a timeout; there
//! is no local fallback when it fails.
//!
//! The extractor never sees the actor's position. Heading commands leave
//! `destination` unset and the validator projects it.

pub mod lexicon;
pub mod strategies;

use std::sync::Arc;
use std::time::Duration;

use crate::error::ExtractError;
use crate::providers::Geocoder;
use crate::types::{CommandKind, MovementCommand};

pub use strategies::{Candidate, StrategyKind, Target, STRATEGIES};

/// Whether the text passes the movement gate
pub fn is_movement_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    lexicon::has_movement_vocabulary(&lower) || strategies::COORDINATE_PAIR.is_match(&lower)
}

/// Gate plus cascade, without any external resolution.
///
/// A pure function of the text: the same input always yields the same
/// candidate.
pub fn classify(text: &str) -> Result<Candidate, ExtractError> {
    if !is_movement_text(text) {
        return Err(ExtractError::NotAMovementCommand);
    }

    STRATEGIES
        .iter()
        .find_map(|strategy| (strategy.run)(text))
        .ok_or(ExtractError::NotAMovementCommand)
}

pub struct CommandExtractor {
    geocoder: Arc<dyn Geocoder>,
    geocode_timeout: Duration,
}

impl CommandExtractor {
    pub fn new(geocoder: Arc<dyn Geocoder>, geocode_timeout: Duration) -> Self {
        Self {
            geocoder,
            geocode_timeout,
        }
    }

    /// Turn raw text into an unvalidated command
    pub async fn extract(&self, text: &str) -> Result<MovementCommand, ExtractError> {
        let candidate = classify(text)?;
        tracing::debug!(
            strategy = ?candidate.strategy,
            confidence = candidate.confidence,
            "Extraction strategy matched"
        );

        let mut command = match candidate.target {
            Target::Coordinate(coordinate) => {
                let mut command =
                    MovementCommand::new(CommandKind::AbsoluteMove, text, candidate.confidence);
                command.destination = Some(coordinate);
                command
            }
            Target::PlaceName(name) => {
                let coordinate = self.resolve(&name).await?;
                let mut command =
                    MovementCommand::new(CommandKind::AbsoluteMove, text, candidate.confidence);
                command.destination = Some(coordinate);
                command.requires_external_resolution = true;
                command.place_name = Some(name);
                command
            }
            Target::Heading {
                direction,
                distance_meters,
            } => {
                let mut command =
                    MovementCommand::new(CommandKind::DirectionMove, text, candidate.confidence);
                command.direction = Some(direction);
                command.distance_meters = distance_meters;
                command
            }
        };

        command.speed_profile = lexicon::detect_speed(&text.to_lowercase());
        Ok(command)
    }

    async fn resolve(&self, name: &str) -> Result<crate::types::Coordinate, ExtractError> {
        match tokio::time::timeout(self.geocode_timeout, self.geocoder.resolve(name)).await {
            Ok(Ok(coordinate)) => {
                tracing::debug!(
                    place = name,
                    geocoder = self.geocoder.name(),
                    position = %coordinate,
                    "Resolved place name"
                );
                Ok(coordinate)
            }
            Ok(Err(source)) => {
                tracing::warn!(place = name, geocoder = self.geocoder.name(), error = %source, "Geocoding failed");
                Err(ExtractError::Geocoding {
                    name: name.to_string(),
                    source,
                })
            }
            Err(_) => {
                tracing::warn!(place = name, geocoder = self.geocoder.name(), "Geocoding timed out");
                Err(ExtractError::GeocodeTimeout(
                    self.geocode_timeout.as_millis() as u64,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeocodeError;
    use crate::providers::StaticGeocoder;
    use crate::types::{Coordinate, Direction, SpeedProfile};
    use async_trait::async_trait;

    fn extractor() -> CommandExtractor {
        CommandExtractor::new(Arc::new(StaticGeocoder::taiwan()), Duration::from_secs(1))
    }

    struct SlowGeocoder;

    #[async_trait]
    impl Geocoder for SlowGeocoder {
        fn name(&self) -> &str {
            "slow"
        }

        async fn resolve(&self, _name: &str) -> Result<Coordinate, GeocodeError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Coordinate::new(0.0, 0.0))
        }
    }

    #[test]
    fn test_gate_rejects_chatter() {
        assert_eq!(classify("hello"), Err(ExtractError::NotAMovementCommand));
        assert_eq!(classify("今天天氣真好"), Err(ExtractError::NotAMovementCommand));
    }

    #[test]
    fn test_bare_coordinates_pass_gate() {
        let candidate = classify("25.0330, 121.5654").unwrap();
        assert_eq!(candidate.strategy, StrategyKind::DirectCoordinates);
    }

    #[test]
    fn test_gate_hit_without_strategy() {
        assert_eq!(classify("let's go"), Err(ExtractError::NotAMovementCommand));
    }

    #[test]
    fn test_literal_coordinates_beat_place_names() {
        let candidate = classify("go to Taipei 101 at 25.0339, 121.5645").unwrap();
        assert_eq!(candidate.strategy, StrategyKind::DirectCoordinates);
        assert_eq!(
            candidate.target,
            Target::Coordinate(Coordinate::new(25.0339, 121.5645))
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let text = "lat: 23.0 lng: 120.2";
        assert_eq!(classify(text), classify(text));
    }

    #[tokio::test]
    async fn test_place_name_is_geocoded() {
        let command = extractor().extract("go to Taichung to eat noodles").await.unwrap();
        assert_eq!(command.kind, CommandKind::AbsoluteMove);
        assert_eq!(command.place_name.as_deref(), Some("Taichung"));
        assert!(command.requires_external_resolution);
        assert_eq!(command.destination, Some(Coordinate::new(24.1477, 120.6736)));
        assert_eq!(command.confidence, 0.9);
    }

    #[tokio::test]
    async fn test_heading_leaves_destination_for_validator() {
        let command = extractor().extract("run 2 km east").await.unwrap();
        assert_eq!(command.kind, CommandKind::DirectionMove);
        assert_eq!(command.direction, Some(Direction::East));
        assert_eq!(command.distance_meters, 2000.0);
        assert_eq!(command.speed_profile, SpeedProfile::Fast);
        assert!(command.destination.is_none());
        assert!(!command.safety_checked);
    }

    #[tokio::test]
    async fn test_unknown_place_is_a_geocoding_failure() {
        let err = extractor().extract("navigate to Atlantis").await.unwrap_err();
        assert!(matches!(err, ExtractError::Geocoding { ref name, .. } if name == "Atlantis"));
    }

    #[tokio::test]
    async fn test_geocoder_timeout() {
        let extractor = CommandExtractor::new(Arc::new(SlowGeocoder), Duration::from_millis(20));
        let err = extractor.extract("帶我去高雄").await.unwrap_err();
        assert_eq!(err, ExtractError::GeocodeTimeout(20));
    }
}
