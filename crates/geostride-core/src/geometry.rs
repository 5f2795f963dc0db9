//! Geometry utilities: great-circle distance, heading projection and
//! bounding-box containment.
//!
//! # Limitations
//!
//! [`project`] is a planar approximation (one degree of latitude is taken as
//! 111 km, longitude is scaled by `cos(latitude)`). It is accurate over tens
//! of kilometers, which is what a single direction command covers. It is not a
//! geodesic solver and degrades near the poles.

use serde::{Deserialize, Serialize};

use crate::types::{Coordinate, Direction};

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters per degree of latitude in the planar projection
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Scale applied to both axes of a diagonal heading (cos 45°)
pub const DIAGONAL_SCALE: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Great-circle distance between two points, in meters (haversine)
pub fn haversine_distance(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lng = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Destination reached by moving `distance_meters` from `origin` along `direction`
pub fn project(origin: Coordinate, direction: Direction, distance_meters: f64) -> Coordinate {
    let (north, east) = direction.components();
    let scale = if direction.is_diagonal() {
        DIAGONAL_SCALE
    } else {
        1.0
    };

    let lat_delta = distance_meters / METERS_PER_DEGREE;
    let latitude = origin.latitude + north * scale * lat_delta;

    // Pure north/south headings must leave longitude untouched, even where
    // cos(latitude) vanishes.
    let longitude = if east == 0.0 {
        origin.longitude
    } else {
        let lng_delta =
            distance_meters / (METERS_PER_DEGREE * origin.latitude.to_radians().cos());
        origin.longitude + east * scale * lng_delta
    };

    Coordinate::new(latitude, longitude)
}

/// Rectangular operating region in decimal degrees.
///
/// A coarse geofence for "inside the supported service area", not a border.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub const fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Default service region: Taiwan main island plus Kenting and the east coast
    pub const fn taiwan() -> Self {
        Self::new(25.5, 21.8, 122.2, 119.8)
    }

    /// Inclusive containment on all four edges
    pub fn contains(&self, point: Coordinate) -> bool {
        point.latitude >= self.south
            && point.latitude <= self.north
            && point.longitude >= self.west
            && point.longitude <= self.east
    }

    pub fn is_well_formed(&self) -> bool {
        self.north.is_finite()
            && self.south.is_finite()
            && self.east.is_finite()
            && self.west.is_finite()
            && self.south <= self.north
            && self.west <= self.east
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::taiwan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TAIPEI: Coordinate = Coordinate::new(25.0330, 121.5654);
    const KAOHSIUNG: Coordinate = Coordinate::new(22.6273, 120.3014);

    #[test]
    fn test_known_distance() {
        // Taipei to Kaohsiung is roughly 297 km as the crow flies
        let d = haversine_distance(TAIPEI, KAOHSIUNG);
        assert!((290_000.0..305_000.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_project_north_200m() {
        let dest = project(TAIPEI, Direction::North, 200.0);
        assert!((dest.latitude - (25.0330 + 200.0 / 111_000.0)).abs() < 1e-9);
        assert_eq!(dest.longitude, TAIPEI.longitude);
    }

    #[test]
    fn test_project_east_scales_with_latitude() {
        let dest = project(TAIPEI, Direction::East, 1_000.0);
        assert_eq!(dest.latitude, TAIPEI.latitude);
        let expected = 1_000.0 / (111_000.0 * 25.0330_f64.to_radians().cos());
        assert!((dest.longitude - TAIPEI.longitude - expected).abs() < 1e-9);
    }

    #[test]
    fn test_project_diagonal_uses_both_axes() {
        let dest = project(TAIPEI, Direction::SouthWest, 1_000.0);
        assert!(dest.latitude < TAIPEI.latitude);
        assert!(dest.longitude < TAIPEI.longitude);
        let lat_shift = TAIPEI.latitude - dest.latitude;
        assert!((lat_shift - DIAGONAL_SCALE * 1_000.0 / 111_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_relative_direction_projection() {
        assert_eq!(
            project(TAIPEI, Direction::Left, 500.0),
            project(TAIPEI, Direction::West, 500.0)
        );
    }

    #[test]
    fn test_bounding_box_edges_inclusive() {
        let region = BoundingBox::taiwan();
        assert!(region.contains(Coordinate::new(25.5, 122.2)));
        assert!(region.contains(Coordinate::new(21.8, 119.8)));
        assert!(region.contains(TAIPEI));
        assert!(region.contains(Coordinate::new(21.9518, 120.7968))); // Kenting
        assert!(!region.contains(Coordinate::new(35.6762, 139.6503))); // Tokyo
        assert!(!region.contains(Coordinate::new(f64::NAN, 121.0)));
        assert!(region.is_well_formed());
    }

    proptest! {
        #[test]
        fn prop_distance_symmetric(
            lat1 in -89.0f64..89.0, lng1 in -179.0f64..179.0,
            lat2 in -89.0f64..89.0, lng2 in -179.0f64..179.0,
        ) {
            let a = Coordinate::new(lat1, lng1);
            let b = Coordinate::new(lat2, lng2);
            prop_assert!((haversine_distance(a, b) - haversine_distance(b, a)).abs() < 1e-6);
        }

        #[test]
        fn prop_distance_to_self_is_zero(lat in -90.0f64..90.0, lng in -180.0f64..180.0) {
            let a = Coordinate::new(lat, lng);
            prop_assert_eq!(haversine_distance(a, a), 0.0);
        }

        #[test]
        fn prop_north_projection_monotone(
            lat in 21.8f64..25.5, lng in 119.8f64..122.2,
            d1 in 0.0f64..50_000.0, extra in 0.001f64..50_000.0,
        ) {
            let origin = Coordinate::new(lat, lng);
            let near = project(origin, Direction::North, d1);
            let far = project(origin, Direction::North, d1 + extra);
            prop_assert!(far.latitude > near.latitude);
            prop_assert_eq!(near.longitude, lng);
            prop_assert_eq!(far.longitude, lng);
        }

        #[test]
        fn prop_points_inside_region_contained(lat in 21.8f64..=25.5, lng in 119.8f64..=122.2) {
            prop_assert!(BoundingBox::taiwan().contains(Coordinate::new(lat, lng)));
        }

        #[test]
        fn prop_points_outside_any_edge_rejected(
            lat in 21.8f64..=25.5, lng in 119.8f64..=122.2, overshoot in 0.0001f64..10.0,
        ) {
            let region = BoundingBox::taiwan();
            prop_assert!(!region.contains(Coordinate::new(region.north + overshoot, lng)));
            prop_assert!(!region.contains(Coordinate::new(region.south - overshoot, lng)));
            prop_assert!(!region.contains(Coordinate::new(lat, region.east + overshoot)));
            prop_assert!(!region.contains(Coordinate::new(lat, region.west - overshoot)));
        }
    }
}
