//! Extraction strategies.
//!
//! Each strategy is a pure function `&str -> Option<Candidate>`. They are tried
//! in [`STRATEGIES`] order and the first hit wins: literal data beats
//! inference.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use super::lexicon;
use crate::types::{Coordinate, Direction};

/// Confidence of a literal coordinate pair or a coordinate carried by a map link
pub const LITERAL_CONFIDENCE: f64 = 0.9;
/// Confidence of a map link that only names a place
pub const LINK_PLACE_CONFIDENCE: f64 = 0.8;
/// Confidence of a named location
pub const NAMED_CONFIDENCE: f64 = 0.9;
/// Confidence of a heading with an explicit distance
pub const HEADING_CONFIDENCE: f64 = 0.8;
/// Confidence of a heading that fell back to the default distance
pub const HEADING_DEFAULT_CONFIDENCE: f64 = 0.7;
/// Distance used when a heading carries no magnitude
pub const DEFAULT_DISTANCE_METERS: f64 = 100.0;
/// Stride length used for "steps"
pub const METERS_PER_STEP: f64 = 0.75;

/// Which strategy produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    DirectCoordinates,
    MapLink,
    NamedLocation,
    DirectionDistance,
    RelativeMovement,
}

/// What a strategy pulled out of the text
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Literal coordinate, usable as is
    Coordinate(Coordinate),
    /// Place name that still has to go through the geocoder
    PlaceName(String),
    /// Heading plus distance, projected later from the current position
    Heading {
        direction: Direction,
        distance_meters: f64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub strategy: StrategyKind,
    pub target: Target,
    pub confidence: f64,
}

pub struct Strategy {
    pub kind: StrategyKind,
    pub run: fn(&str) -> Option<Candidate>,
}

/// The cascade, in priority order
pub const STRATEGIES: [Strategy; 5] = [
    Strategy {
        kind: StrategyKind::DirectCoordinates,
        run: direct_coordinates,
    },
    Strategy {
        kind: StrategyKind::MapLink,
        run: map_link,
    },
    Strategy {
        kind: StrategyKind::NamedLocation,
        run: named_location,
    },
    Strategy {
        kind: StrategyKind::DirectionDistance,
        run: direction_distance,
    },
    Strategy {
        kind: StrategyKind::RelativeMovement,
        run: relative_movement,
    },
];

lazy_static! {
    static ref COORDINATE_PATTERNS: Vec<Regex> = vec![
        // lat: 25.0330 lng: 121.5654
        Regex::new(
            r"(?i)\blat(?:itude)?\s*[:：=]?\s*(-?\d+(?:\.\d+)?)\s*[,，;]?\s*(?:lng|lon|long|longitude)\s*[:：=]?\s*(-?\d+(?:\.\d+)?)"
        )
        .unwrap(),
        // 緯度: 25.0330 經度: 121.5654
        Regex::new(r"緯度\s*[:：]?\s*(-?\d+(?:\.\d+)?)\s*[,，]?\s*經度\s*[:：]?\s*(-?\d+(?:\.\d+)?)").unwrap(),
        // 25.0330, 121.5654
        Regex::new(r"(-?\d{1,3}\.\d+)\s*[,，]\s*(-?\d{1,3}\.\d+)").unwrap(),
    ];

    /// Bare decimal pair, also consulted by the movement gate
    pub static ref COORDINATE_PAIR: Regex = Regex::new(r"-?\d{1,3}\.\d+\s*[,，]\s*-?\d{1,3}\.\d+").unwrap();

    static ref URL_PATTERN: Regex = Regex::new(r"https?://[^\s<>\x22]+").unwrap();

    static ref DISTANCE_PATTERN: Regex = Regex::new(
        r"(?i)(\d+(?:\.\d+)?)\s*(kilometers?|kilometres?|km|公里|meters?|metres?|m\b|公尺|米|steps?|步)"
    )
    .unwrap();

    static ref ENGLISH_PLACE_PATTERN: Regex = Regex::new(
        r"(?i)\b(?:go|move|navigate|travel|head|walk|run|fly|take\s+me|bring\s+me)\b.*?\bto\s+(.+)"
    )
    .unwrap();

    static ref CHINESE_PLACE_PATTERN: Regex = Regex::new(
        r"(?:移動.*?到|帶我去|導航到|走到|跑到|飛到|前往|去)\s*([^，。！？,.!?\s吃喝玩買看]+)"
    )
    .unwrap();
}

fn parse_pair(lat: &str, lng: &str) -> Option<Coordinate> {
    let coordinate = Coordinate::new(lat.trim().parse().ok()?, lng.trim().parse().ok()?);
    coordinate.is_on_globe().then_some(coordinate)
}

/// Strategy 1: decimal-degree pairs in bare, labeled or localized form
pub fn direct_coordinates(text: &str) -> Option<Candidate> {
    COORDINATE_PATTERNS.iter().find_map(|pattern| {
        let caps = pattern.captures(text)?;
        let coordinate = parse_pair(caps.get(1)?.as_str(), caps.get(2)?.as_str())?;
        Some(Candidate {
            strategy: StrategyKind::DirectCoordinates,
            target: Target::Coordinate(coordinate),
            confidence: LITERAL_CONFIDENCE,
        })
    })
}

fn is_map_link(url: &Url) -> bool {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let path = url.path();
    (host.contains("google.") && (path.starts_with("/maps") || host.starts_with("maps.")))
        || host == "maps.app.goo.gl"
        || (host == "goo.gl" && path.starts_with("/maps"))
}

/// `+` and `%XX` decoding of a single path segment
fn decode_segment(segment: &str) -> String {
    url::form_urlencoded::parse(segment.as_bytes())
        .map(|(key, value)| {
            if value.is_empty() {
                key.into_owned()
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn link_coordinate(url: &Url) -> Option<Coordinate> {
    // .../@lat,lng[,zoom]
    let from_path = url.path_segments().and_then(|mut segments| {
        segments.find_map(|segment| {
            let decoded = decode_segment(segment);
            let rest = decoded.strip_prefix('@')?;
            let mut parts = rest.split(',');
            parse_pair(parts.next()?, parts.next()?)
        })
    });

    from_path.or_else(|| {
        url.query_pairs()
            .filter(|(key, _)| matches!(key.as_ref(), "ll" | "center" | "q"))
            .find_map(|(_, value)| {
                let (lat, lng) = value.split_once(',')?;
                parse_pair(lat, lng)
            })
    })
}

fn link_place_name(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.collect();
    let index = segments.iter().position(|segment| *segment == "place")?;
    let name = decode_segment(segments.get(index + 1)?);
    let name = name.trim();
    (!name.is_empty() && !name.starts_with('@')).then(|| name.to_string())
}

/// Strategy 2: coordinates (or a place name) embedded in a mapping-service link
pub fn map_link(text: &str) -> Option<Candidate> {
    URL_PATTERN
        .find_iter(text)
        .filter_map(|found| Url::parse(found.as_str()).ok())
        .filter(is_map_link)
        .find_map(|url| {
            if let Some(coordinate) = link_coordinate(&url) {
                return Some(Candidate {
                    strategy: StrategyKind::MapLink,
                    target: Target::Coordinate(coordinate),
                    confidence: LITERAL_CONFIDENCE,
                });
            }
            link_place_name(&url).map(|name| Candidate {
                strategy: StrategyKind::MapLink,
                target: Target::PlaceName(name),
                confidence: LINK_PLACE_CONFIDENCE,
            })
        })
}

/// Trim a captured English phrase down to the place it names
fn clean_english_phrase(raw: &str) -> Option<String> {
    let clause = raw
        .split(|c: char| ",.!?;，。！？；\n".contains(c))
        .next()
        .unwrap_or_default();

    let mut words = clause.split_whitespace().peekable();
    while let Some(word) = words.peek() {
        if lexicon::ARTICLES.contains(&word.to_lowercase().as_str()) {
            words.next();
        } else {
            break;
        }
    }

    let phrase: Vec<&str> = words
        .take_while(|word| !lexicon::PHRASE_STOP_WORDS.contains(&word.to_lowercase().as_str()))
        .collect();

    let phrase = phrase.join(" ");
    if phrase.is_empty() || lexicon::starts_with_direction(&phrase) {
        return None;
    }
    Some(phrase)
}

/// Strategy 3: gazetteer hit, else the argument of a "go to X" style phrase
pub fn named_location(text: &str) -> Option<Candidate> {
    let lower = text.to_lowercase();

    let name = lexicon::find_gazetteer_entry(&lower)
        .map(str::to_string)
        .or_else(|| {
            CHINESE_PLACE_PATTERN
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|name| !name.is_empty() && !lexicon::starts_with_direction(name))
        })
        .or_else(|| {
            ENGLISH_PLACE_PATTERN
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| clean_english_phrase(m.as_str()))
        })?;

    Some(Candidate {
        strategy: StrategyKind::NamedLocation,
        target: Target::PlaceName(name),
        confidence: NAMED_CONFIDENCE,
    })
}

fn unit_factor(unit: &str) -> f64 {
    let unit = unit.to_lowercase();
    if unit.starts_with("kilomet") || unit == "km" || unit == "公里" {
        1000.0
    } else if unit.starts_with("step") || unit == "步" {
        METERS_PER_STEP
    } else {
        1.0
    }
}

/// Strategy 4: heading plus an optional distance
pub fn direction_distance(text: &str) -> Option<Candidate> {
    let lower = text.to_lowercase();
    let direction = lexicon::find_direction(&lower)?;

    let explicit = DISTANCE_PATTERN.captures(&lower).and_then(|caps| {
        let magnitude: f64 = caps.get(1)?.as_str().parse().ok()?;
        Some(magnitude * unit_factor(caps.get(2)?.as_str()))
    });

    let (distance_meters, confidence) = match explicit {
        Some(distance) => (distance, HEADING_CONFIDENCE),
        None => (DEFAULT_DISTANCE_METERS, HEADING_DEFAULT_CONFIDENCE),
    };

    Some(Candidate {
        strategy: StrategyKind::DirectionDistance,
        target: Target::Heading {
            direction,
            distance_meters,
        },
        confidence,
    })
}

/// Strategy 5: small nudges without explicit heading or distance.
///
/// Reserved; no phrasing is supported yet.
pub fn relative_movement(_text: &str) -> Option<Candidate> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(candidate: Option<Candidate>) -> Option<String> {
        match candidate?.target {
            Target::PlaceName(name) => Some(name),
            _ => None,
        }
    }

    fn coordinate(candidate: Option<Candidate>) -> Option<Coordinate> {
        match candidate?.target {
            Target::Coordinate(c) => Some(c),
            _ => None,
        }
    }

    #[test]
    fn test_direct_coordinate_forms() {
        let expected = Some(Coordinate::new(25.0330, 121.5654));
        assert_eq!(coordinate(direct_coordinates("go to 25.0330, 121.5654")), expected);
        assert_eq!(coordinate(direct_coordinates("lat: 25.0330 lng: 121.5654")), expected);
        assert_eq!(coordinate(direct_coordinates("Latitude=25.0330, Longitude=121.5654")), expected);
        assert_eq!(coordinate(direct_coordinates("緯度：25.0330 經度：121.5654")), expected);
        assert_eq!(coordinate(direct_coordinates("移動到 25.0330，121.5654")), expected);
        assert!(direct_coordinates("move 200 meters north").is_none());
    }

    #[test]
    fn test_direct_coordinates_reject_impossible_values() {
        assert!(direct_coordinates("go to 125.0, 121.5").is_none());
    }

    #[test]
    fn test_map_link_with_encoded_query() {
        let c = coordinate(map_link(
            "take me here https://maps.google.com/maps?ll=23.0162277%2C120.2353557",
        ));
        assert_eq!(c, Some(Coordinate::new(23.0162277, 120.2353557)));
    }

    #[test]
    fn test_map_link_at_segment() {
        let candidate = map_link("https://www.google.com/maps/@23.0162277,120.2353557,15z").unwrap();
        assert_eq!(candidate.confidence, LITERAL_CONFIDENCE);
        assert_eq!(
            candidate.target,
            Target::Coordinate(Coordinate::new(23.0162277, 120.2353557))
        );
    }

    #[test]
    fn test_map_link_place_needs_resolution() {
        let candidate =
            map_link("https://www.google.com/maps/place/%E5%8F%B0%E5%8C%97101").unwrap();
        assert_eq!(candidate.target, Target::PlaceName("台北101".to_string()));
        assert_eq!(candidate.confidence, LINK_PLACE_CONFIDENCE);

        let spaced = map_link("https://www.google.com.tw/maps/place/Sun+Moon%20Lake/data=x");
        assert_eq!(place(spaced), Some("Sun Moon Lake".to_string()));
    }

    #[test]
    fn test_map_link_ignores_other_hosts() {
        assert!(map_link("https://example.com/maps/place/Taipei").is_none());
    }

    #[test]
    fn test_named_location_gazetteer() {
        assert_eq!(place(named_location("帶我去高雄")), Some("高雄".to_string()));
        assert_eq!(
            place(named_location("go to Taichung to eat noodles")),
            Some("Taichung".to_string())
        );
    }

    #[test]
    fn test_named_location_phrase_stops_at_subclause() {
        assert_eq!(
            place(named_location("go to Lukang to eat oyster omelettes")),
            Some("Lukang".to_string())
        );
        assert_eq!(
            place(named_location("please navigate to the Grand Hotel, thanks")),
            Some("Grand Hotel".to_string())
        );
        assert_eq!(place(named_location("去三峽吃金牛角")), Some("三峽".to_string()));
    }

    #[test]
    fn test_named_location_skips_direction_arguments() {
        assert!(named_location("move 300 meters to the north").is_none());
        assert!(named_location("move to the left 50 meters").is_none());
        assert!(named_location("去北邊 300公尺").is_none());
        assert!(named_location("移動到北邊200米").is_none());
        assert_eq!(place(named_location("去南港")), Some("南港".to_string()));
    }

    #[test]
    fn test_direction_led_commands_fall_through_to_heading() {
        let heading = |text: &str| {
            let candidate = STRATEGIES.iter().find_map(|strategy| (strategy.run)(text))?;
            match candidate.target {
                Target::Heading {
                    direction,
                    distance_meters,
                } => Some((direction, distance_meters)),
                _ => None,
            }
        };

        assert_eq!(heading("去北邊 300公尺"), Some((Direction::North, 300.0)));
        assert_eq!(heading("移動到北邊200米"), Some((Direction::North, 200.0)));
        assert_eq!(heading("move to the left 50 meters"), Some((Direction::Left, 50.0)));
    }

    #[test]
    fn test_direction_distance_units() {
        let heading = |text: &str| match direction_distance(text).map(|c| c.target) {
            Some(Target::Heading {
                direction,
                distance_meters,
            }) => Some((direction, distance_meters)),
            _ => None,
        };

        assert_eq!(heading("move 200 meters north"), Some((Direction::North, 200.0)));
        assert_eq!(heading("head east 2 km"), Some((Direction::East, 2000.0)));
        assert_eq!(heading("往西南走 1.5公里"), Some((Direction::SouthWest, 1500.0)));
        assert_eq!(heading("walk forward 100 steps"), Some((Direction::Forward, 75.0)));
        assert_eq!(heading("向左 50米"), Some((Direction::Left, 50.0)));
        assert_eq!(heading("go west"), Some((Direction::West, DEFAULT_DISTANCE_METERS)));
    }

    #[test]
    fn test_direction_confidence_reflects_magnitude() {
        assert_eq!(
            direction_distance("move 200 meters north").unwrap().confidence,
            HEADING_CONFIDENCE
        );
        assert_eq!(
            direction_distance("go north").unwrap().confidence,
            HEADING_DEFAULT_CONFIDENCE
        );
    }

    #[test]
    fn test_relative_movement_is_reserved() {
        assert!(relative_movement("move a bit").is_none());
    }

    #[test]
    fn test_strategy_order() {
        let kinds: Vec<StrategyKind> = STRATEGIES.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StrategyKind::DirectCoordinates,
                StrategyKind::MapLink,
                StrategyKind::NamedLocation,
                StrategyKind::DirectionDistance,
                StrategyKind::RelativeMovement,
            ]
        );
    }
}
