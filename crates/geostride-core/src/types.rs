//! Shared domain types: actors, coordinates and movement commands

use serde::{Deserialize, Serialize};

/// Actor identifier (the avatar whose position the pipeline mutates)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A point in decimal degrees.
///
/// The type only carries data; whether a point is inside the supported
/// service area is decided by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Whether the point is a plausible WGS84 position at all
    pub fn is_on_globe(&self) -> bool {
        self.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Kind of movement a command describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Jump to an explicit destination
    AbsoluteMove,
    /// Small nudge relative to the current position
    RelativeMove,
    /// Heading plus distance, projected from the current position
    DirectionMove,
}

/// Travel tempo, used for the ETA estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedProfile {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl SpeedProfile {
    /// Speed in meters per second
    pub fn meters_per_second(&self) -> f64 {
        match self {
            SpeedProfile::Slow => 1.0,
            SpeedProfile::Normal => 2.5,
            SpeedProfile::Fast => 5.0,
        }
    }
}

impl std::fmt::Display for SpeedProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SpeedProfile::Slow => "slow",
            SpeedProfile::Normal => "normal",
            SpeedProfile::Fast => "fast",
        })
    }
}

/// Compass octants plus the four screen-relative directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    /// The compass heading a direction resolves to.
    ///
    /// Avatars have no facing, so relative directions are read on the
    /// north-up map: forward is north, left is west.
    pub fn compass(&self) -> Direction {
        match self {
            Direction::Forward => Direction::North,
            Direction::Backward => Direction::South,
            Direction::Left => Direction::West,
            Direction::Right => Direction::East,
            other => *other,
        }
    }

    pub fn is_diagonal(&self) -> bool {
        matches!(
            self.compass(),
            Direction::NorthEast | Direction::NorthWest | Direction::SouthEast | Direction::SouthWest
        )
    }

    /// (north component, east component), each in {-1, 0, 1}
    pub fn components(&self) -> (f64, f64) {
        match self.compass() {
            Direction::North => (1.0, 0.0),
            Direction::NorthEast => (1.0, 1.0),
            Direction::East => (0.0, 1.0),
            Direction::SouthEast => (-1.0, 1.0),
            Direction::South => (-1.0, 0.0),
            Direction::SouthWest => (-1.0, -1.0),
            Direction::West => (0.0, -1.0),
            Direction::NorthWest => (1.0, -1.0),
            // compass() never yields a relative direction
            _ => (0.0, 0.0),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Direction::North => "north",
            Direction::NorthEast => "northeast",
            Direction::East => "east",
            Direction::SouthEast => "southeast",
            Direction::South => "south",
            Direction::SouthWest => "southwest",
            Direction::West => "west",
            Direction::NorthWest => "northwest",
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(label)
    }
}

/// A movement command, produced per request.
///
/// Populated by exactly one extraction strategy, finalized by the validator,
/// consumed once by the execution step. Never persisted itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementCommand {
    pub kind: CommandKind,

    /// Required after validation
    pub destination: Option<Coordinate>,

    /// Only set for direction moves
    pub direction: Option<Direction>,

    /// Only meaningful for direction moves
    pub distance_meters: f64,

    pub speed_profile: SpeedProfile,

    /// Raw input, preserved for audit
    pub original_text: String,

    /// Heuristic score in [0, 1] set by the producing strategy
    pub confidence: f64,

    /// True when a place name had to go through the geocoder
    pub requires_external_resolution: bool,

    /// Place name that was resolved, if any
    pub place_name: Option<String>,

    /// Set only by the validator
    pub safety_checked: bool,

    /// Great-circle hop length, known once the validator saw a current position
    pub hop_distance_meters: Option<f64>,

    pub estimated_seconds: u64,
}

impl MovementCommand {
    pub fn new(kind: CommandKind, original_text: impl Into<String>, confidence: f64) -> Self {
        Self {
            kind,
            destination: None,
            direction: None,
            distance_meters: 0.0,
            speed_profile: SpeedProfile::Normal,
            original_text: original_text.into(),
            confidence,
            requires_external_resolution: false,
            place_name: None,
            safety_checked: false,
            hop_distance_meters: None,
            estimated_seconds: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_profiles() {
        assert_eq!(SpeedProfile::default(), SpeedProfile::Normal);
        assert_eq!(SpeedProfile::Slow.meters_per_second(), 1.0);
        assert_eq!(SpeedProfile::Normal.meters_per_second(), 2.5);
        assert_eq!(SpeedProfile::Fast.meters_per_second(), 5.0);
    }

    #[test]
    fn test_relative_directions_resolve_north_up() {
        assert_eq!(Direction::Forward.compass(), Direction::North);
        assert_eq!(Direction::Backward.compass(), Direction::South);
        assert_eq!(Direction::Left.compass(), Direction::West);
        assert_eq!(Direction::Right.compass(), Direction::East);
        assert!(Direction::SouthWest.is_diagonal());
        assert!(!Direction::Left.is_diagonal());
    }

    #[test]
    fn test_new_command_is_unchecked() {
        let cmd = MovementCommand::new(CommandKind::AbsoluteMove, "go", 0.9);
        assert!(!cmd.safety_checked);
        assert!(cmd.destination.is_none());
        assert_eq!(cmd.speed_profile, SpeedProfile::Normal);
    }

    #[test]
    fn test_command_serialization() {
        let mut cmd = MovementCommand::new(CommandKind::DirectionMove, "move north", 0.7);
        cmd.direction = Some(Direction::NorthEast);
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["kind"], "direction_move");
        assert_eq!(json["direction"], "north_east");
        assert_eq!(json["speed_profile"], "normal");
    }

    #[test]
    fn test_coordinate_globe_check() {
        assert!(Coordinate::new(25.0, 121.5).is_on_globe());
        assert!(!Coordinate::new(95.0, 121.5).is_on_globe());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_on_globe());
    }
}
