//! Error types for Geostride Core
//!
//! Every pipeline stage owns a `thiserror` enum. Each enum maps onto exactly
//! one stable [`ErrorCode`], which is what callers see on the wire.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Coordinate;

/// Result type alias for crate-level operations (configuration, IO)
pub type Result<T> = std::result::Result<T, CoreError>;

/// Stable error codes carried by every non-successful movement outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotAMovementCommand,
    ParseError,
    OutOfBounds,
    DistanceTooLarge,
    LowConfidence,
    SecurityViolation,
    PlayerNotFound,
    ExecutionError,
    RateLimited,
}

impl ErrorCode {
    /// Wire representation of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotAMovementCommand => "NOT_A_MOVEMENT_COMMAND",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::OutOfBounds => "OUT_OF_BOUNDS",
            ErrorCode::DistanceTooLarge => "DISTANCE_TOO_LARGE",
            ErrorCode::LowConfidence => "LOW_CONFIDENCE",
            ErrorCode::SecurityViolation => "SECURITY_VIOLATION",
            ErrorCode::PlayerNotFound => "PLAYER_NOT_FOUND",
            ErrorCode::ExecutionError => "EXECUTION_ERROR",
            ErrorCode::RateLimited => "RATE_LIMITED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crate-level error (configuration loading and saving)
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Geocoder failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("no results found for: {0}")]
    NotFound(String),

    #[error("geocoding provider unavailable: {0}")]
    Unavailable(String),

    #[error("geocoding request failed: {0}")]
    Request(String),

    #[error("geocoding provider returned status {0}")]
    Status(String),
}

/// Position store failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("actor not found: {0}")]
    NotFound(String),

    #[error("position store backend error: {0}")]
    Backend(String),
}

/// Narrative generation failures. Never surfaced to callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NarrativeError {
    #[error("narrative request failed: {0}")]
    Request(String),

    #[error("narrative provider returned an empty response")]
    Empty,
}

/// Command extraction failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("not a movement command")]
    NotAMovementCommand,

    #[error("failed to resolve location \"{name}\": {source}")]
    Geocoding {
        name: String,
        #[source]
        source: GeocodeError,
    },

    #[error("geocoding timed out after {0}ms")]
    GeocodeTimeout(u64),
}

impl ExtractError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ExtractError::NotAMovementCommand => ErrorCode::NotAMovementCommand,
            ExtractError::Geocoding { .. } | ExtractError::GeocodeTimeout(_) => {
                ErrorCode::ParseError
            }
        }
    }
}

/// Command validation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("no valid destination")]
    MissingDestination,

    #[error("destination {0} is outside the operating region")]
    OutOfBounds(Coordinate),

    #[error("movement distance too large: {distance:.2} meters (max: {max:.0} meters)")]
    DistanceTooLarge { distance: f64, max: f64 },

    #[error("command confidence too low: {confidence:.2} (min: {min:.2})")]
    LowConfidence { confidence: f64, min: f64 },
}

impl ValidationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ValidationError::MissingDestination => ErrorCode::ParseError,
            ValidationError::OutOfBounds(_) => ErrorCode::OutOfBounds,
            ValidationError::DistanceTooLarge { .. } => ErrorCode::DistanceTooLarge,
            ValidationError::LowConfidence { .. } => ErrorCode::LowConfidence,
        }
    }
}

/// Business-rule re-check failures raised right before execution
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SecurityViolation {
    #[error("movement command failed basic safety checks")]
    NotSafetyChecked,

    #[error("movement command has no destination")]
    MissingDestination,

    #[error("movement distance too large: {distance:.2} meters (max: {max:.0} meters)")]
    DistanceTooLarge { distance: f64, max: f64 },

    #[error("movement command confidence too low: {:.1}% (min: {:.0}%)", .confidence * 100.0, .min * 100.0)]
    LowConfidence { confidence: f64, min: f64 },

    #[error("destination {0} is in a restricted area")]
    RestrictedZone(Coordinate),
}

impl SecurityViolation {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::SecurityViolation
    }
}
