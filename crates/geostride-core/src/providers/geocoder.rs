//! Geocoder implementations

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;

use super::Geocoder;
use crate::error::GeocodeError;
use crate::extract::lexicon;
use crate::types::Coordinate;

/// In-memory place table, matched case-insensitively.
///
/// An exact key wins; otherwise the longest key contained in the query is
/// used, so "台北101 observatory" still finds "台北101".
#[derive(Debug, Default)]
pub struct StaticGeocoder {
    places: RwLock<HashMap<String, Coordinate>>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every place the extractor's gazetteer knows, so a recognized name
    /// always resolves offline
    pub fn taiwan() -> Self {
        let geocoder = Self::new();
        for (name, lat, lng) in lexicon::PLACES {
            geocoder.insert(name, Coordinate::new(*lat, *lng));
        }
        geocoder
    }

    pub fn with_place(self, name: impl AsRef<str>, coordinate: Coordinate) -> Self {
        self.insert(name, coordinate);
        self
    }

    pub fn insert(&self, name: impl AsRef<str>, coordinate: Coordinate) {
        self.places
            .write()
            .insert(name.as_ref().trim().to_lowercase(), coordinate);
    }

    pub fn len(&self) -> usize {
        self.places.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.read().is_empty()
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    fn name(&self) -> &str {
        "static"
    }

    async fn resolve(&self, name: &str) -> Result<Coordinate, GeocodeError> {
        let query = name.trim().to_lowercase();
        let places = self.places.read();

        if let Some(coordinate) = places.get(&query) {
            return Ok(*coordinate);
        }

        places
            .iter()
            .filter(|(key, _)| query.contains(key.as_str()))
            .max_by_key(|(key, _)| key.chars().count())
            .map(|(_, coordinate)| *coordinate)
            .ok_or_else(|| GeocodeError::NotFound(name.to_string()))
    }
}

/// City names used to disambiguate text-search results
const CITY_HINTS: &[&str] = &[
    "台北", "新北", "桃園", "台中", "台南", "高雄", "基隆", "新竹", "嘉義", "彰化", "南投", "雲林",
    "屏東", "宜蘭", "花蓮", "台東", "澎湖", "金門", "馬祖",
];

const PLACES_API_URL: &str = "https://maps.googleapis.com/maps/api/place";

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    #[serde(default)]
    results: Vec<PlaceResult>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    #[serde(default)]
    formatted_address: String,
    geometry: PlaceGeometry,
}

#[derive(Debug, Deserialize)]
struct PlaceGeometry {
    location: PlaceLocation,
}

#[derive(Debug, Deserialize)]
struct PlaceLocation {
    lat: f64,
    lng: f64,
}

/// Google Places text-search client
pub struct GooglePlacesGeocoder {
    api_key: String,
    base_url: String,
    region: String,
    language: String,
    http_client: reqwest::Client,
}

impl GooglePlacesGeocoder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: PLACES_API_URL.to_string(),
            region: "tw".to_string(),
            language: "zh-TW".to_string(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/textsearch/json", self.base_url)
    }
}

/// Pick the first result in the city the query names, else the first result
fn pick_result<'a>(query: &str, results: &'a [PlaceResult]) -> Option<&'a PlaceResult> {
    let city = CITY_HINTS.iter().find(|city| query.contains(**city));
    city.and_then(|city| {
        results
            .iter()
            .find(|result| result.formatted_address.contains(city))
    })
    .or_else(|| results.first())
}

#[async_trait]
impl Geocoder for GooglePlacesGeocoder {
    fn name(&self) -> &str {
        "google_places"
    }

    async fn resolve(&self, name: &str) -> Result<Coordinate, GeocodeError> {
        if self.api_key.is_empty() {
            return Err(GeocodeError::Unavailable("missing API key".to_string()));
        }

        let query = format!("{} Taiwan", name);
        let response = self
            .http_client
            .get(self.endpoint())
            .query(&[
                ("query", query.as_str()),
                ("key", self.api_key.as_str()),
                ("region", self.region.as_str()),
                ("language", self.language.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.to_string()));
        }

        let body: TextSearchResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Err(GeocodeError::NotFound(name.to_string())),
            other => return Err(GeocodeError::Status(other.to_string())),
        }

        let place = pick_result(name, &body.results)
            .ok_or_else(|| GeocodeError::NotFound(name.to_string()))?;

        tracing::debug!(
            query = name,
            address = %place.formatted_address,
            "Resolved place via Google Places"
        );

        Ok(Coordinate::new(
            place.geometry.location.lat,
            place.geometry.location.lng,
        ))
    }
}
