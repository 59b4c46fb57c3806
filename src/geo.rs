// src/geo.rs
//! Great-circle proximity search and the geocoding collaborator it relies on.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;
use tracing::{debug, warn};

use crate::dataset::GeoRestaurant;
use crate::error::{RecommendError, Result};

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const DEFAULT_RADIUS_KM: f64 = 5.0;
pub const DEFAULT_NEARBY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(RecommendError::InvalidConfig(format!("latitude {} out of range", lat)));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(RecommendError::InvalidConfig(format!("longitude {} out of range", lon)));
        }
        Ok(Self { lat, lon })
    }
}

/// Haversine distance in kilometres.
pub fn haversine_km(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let lat1_rad = p1.lat.to_radians();
    let lat2_rad = p2.lat.to_radians();
    let delta_lat = (p2.lat - p1.lat).to_radians();
    let delta_lon = (p2.lon - p1.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Nearby {
    pub restaurant: GeoRestaurant,
    pub distance_km: f64,
}

/// Linear scan: every restaurant within `radius_km` of `origin`, closest
/// first, at most `limit` of them.
pub fn find_nearby(
    origin: &GeoPoint,
    restaurants: &[GeoRestaurant],
    radius_km: f64,
    limit: usize,
) -> Vec<Nearby> {
    let mut hits: Vec<Nearby> = restaurants
        .iter()
        .map(|r| Nearby {
            distance_km: haversine_km(origin, &r.point),
            restaurant: r.clone(),
        })
        .filter(|n| n.distance_km <= radius_km)
        .collect();

    hits.sort_by(|a, b| a.distance_km.partial_cmp(&b.distance_km).unwrap_or(Ordering::Equal));
    hits.truncate(limit);
    debug!(within_radius = hits.len(), radius_km, "proximity scan finished");
    hits
}

/// Address lookup service. Implementations report transport or API
/// failures as `RecommendError::Geocoding`.
pub trait Geocoder {
    /// Suggestions for a partial address.
    fn autocomplete(&self, input: &str) -> Result<Vec<String>>;
    /// Coordinates for a full address, `None` if the service knows no match.
    fn geocode(&self, address: &str) -> Result<Option<GeoPoint>>;
}

const AUTOCOMPLETE_URL: &str = "https://maps.googleapis.com/maps/api/place/autocomplete/json";
const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[derive(Deserialize)]
struct AutocompleteResponse {
    status: String,
    #[serde(default)]
    predictions: Vec<Prediction>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct Prediction {
    description: String,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn api_status(status: &str, message: Option<String>) -> Result<()> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => Err(RecommendError::Geocoding(match message {
            Some(msg) => format!("{}: {}", other, msg),
            None => other.to_string(),
        })),
    }
}

/// Google Maps Places/Geocoding over blocking HTTP.
pub struct GoogleMapsGeocoder {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl GoogleMapsGeocoder {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RecommendError::Geocoding(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    fn get<T: for<'de> Deserialize<'de>>(&self, url: &str, params: &[(&str, &str)]) -> Result<T> {
        self.client
            .get(url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<T>())
            .map_err(|e| RecommendError::Geocoding(e.to_string()))
    }
}

impl Geocoder for GoogleMapsGeocoder {
    fn autocomplete(&self, input: &str) -> Result<Vec<String>> {
        let response: AutocompleteResponse = self.get(AUTOCOMPLETE_URL, &[("input", input)])?;
        api_status(&response.status, response.error_message)?;
        Ok(response.predictions.into_iter().map(|p| p.description).collect())
    }

    fn geocode(&self, address: &str) -> Result<Option<GeoPoint>> {
        let response: GeocodeResponse = self.get(GEOCODE_URL, &[("address", address)])?;
        api_status(&response.status, response.error_message)?;
        match response.results.into_iter().next() {
            Some(result) => {
                let loc = result.geometry.location;
                GeoPoint::new(loc.lat, loc.lng).map(Some)
            }
            None => Ok(None),
        }
    }
}

/// Result of the address-based search, each variant carrying what the
/// presenter needs.
#[derive(Debug, Clone, PartialEq)]
pub enum NearbyLookup {
    Found {
        address: String,
        origin: GeoPoint,
        nearby: Vec<Nearby>,
    },
    NothingInRadius {
        address: String,
        origin: GeoPoint,
    },
    NoSuggestions,
    NoCoordinates {
        address: String,
    },
    Failed(String),
}

impl NearbyLookup {
    /// User-facing line for the outcomes that don't produce a table.
    pub fn message(&self, radius_km: f64) -> Option<String> {
        match self {
            NearbyLookup::Found { .. } => None,
            NearbyLookup::NothingInRadius { .. } => {
                Some(format!("No restaurants found within {} km.", radius_km))
            }
            NearbyLookup::NoSuggestions => Some("No suggestions found.".to_string()),
            NearbyLookup::NoCoordinates { .. } => {
                Some("Could not fetch coordinates for the selected location.".to_string())
            }
            NearbyLookup::Failed(reason) => Some(format!("Error looking up the location: {}", reason)),
        }
    }
}

/// Resolves a free-text address through `geocoder` (first suggestion wins)
/// and scans `restaurants` around it. Collaborator errors are folded into the
/// outcome instead of being returned.
pub fn nearby_for_address(
    geocoder: &dyn Geocoder,
    query: &str,
    restaurants: &[GeoRestaurant],
    radius_km: f64,
    limit: usize,
) -> NearbyLookup {
    let suggestions = match geocoder.autocomplete(query) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "autocomplete failed");
            return NearbyLookup::Failed(e.to_string());
        }
    };
    let Some(address) = suggestions.into_iter().next() else {
        return NearbyLookup::NoSuggestions;
    };

    let origin = match geocoder.geocode(&address) {
        Ok(Some(point)) => point,
        Ok(None) => return NearbyLookup::NoCoordinates { address },
        Err(e) => {
            warn!(error = %e, %address, "geocoding failed");
            return NearbyLookup::Failed(e.to_string());
        }
    };

    let nearby = find_nearby(&origin, restaurants, radius_km, limit);
    if nearby.is_empty() {
        NearbyLookup::NothingInRadius { address, origin }
    } else {
        NearbyLookup::Found {
            address,
            origin,
            nearby,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(name: &str, lat: f64, lon: f64) -> GeoRestaurant {
        GeoRestaurant {
            name: name.to_string(),
            point: GeoPoint::new(lat, lon).unwrap(),
            url: crate::dataset::search_url(name),
        }
    }

    struct StubGeocoder {
        suggestions: Result<Vec<String>>,
        point: Option<GeoPoint>,
    }

    impl Geocoder for StubGeocoder {
        fn autocomplete(&self, _input: &str) -> Result<Vec<String>> {
            match &self.suggestions {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(RecommendError::Geocoding(e.to_string())),
            }
        }

        fn geocode(&self, _address: &str) -> Result<Option<GeoPoint>> {
            Ok(self.point)
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        let p = GeoPoint::new(40.7128, -74.0060).unwrap();
        assert_eq!(haversine_km(&p, &p), 0.0);
    }

    #[test]
    fn new_york_to_los_angeles() {
        let ny = GeoPoint::new(40.7128, -74.0060).unwrap();
        let la = GeoPoint::new(34.0522, -118.2437).unwrap();
        let distance = haversine_km(&ny, &la);
        assert!((distance - 3935.0).abs() < 3935.0 * 0.01, "got {}", distance);
        assert!((haversine_km(&la, &ny) - distance).abs() < 1e-9);
    }

    #[test]
    fn rejects_out_of_range_points() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -181.0).is_err());
    }

    #[test]
    fn nearby_filters_sorts_and_truncates() {
        let origin = GeoPoint::new(40.7128, -74.0060).unwrap();
        let rows = vec![
            restaurant("far", 40.80, -74.00),      // ~9.7 km
            restaurant("close", 40.7130, -74.0062),
            restaurant("mid", 40.73, -74.00),      // ~2 km
            restaurant("la", 34.0522, -118.2437),
        ];
        let hits = find_nearby(&origin, &rows, DEFAULT_RADIUS_KM, DEFAULT_NEARBY_LIMIT);
        let names: Vec<&str> = hits.iter().map(|n| n.restaurant.name.as_str()).collect();
        assert_eq!(names, vec!["close", "mid"]);

        let one = find_nearby(&origin, &rows, DEFAULT_RADIUS_KM, 1);
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].restaurant.name, "close");
    }

    #[test]
    fn lookup_uses_first_suggestion() {
        let geocoder = StubGeocoder {
            suggestions: Ok(vec!["Plaza 5, Jersey City".to_string(), "Other".to_string()]),
            point: Some(GeoPoint::new(40.7178, -74.0339).unwrap()),
        };
        let rows = vec![restaurant("Harborside Grill", 40.7180, -74.0335)];
        match nearby_for_address(&geocoder, "plaza 5", &rows, 5.0, 5) {
            NearbyLookup::Found { address, nearby, .. } => {
                assert_eq!(address, "Plaza 5, Jersey City");
                assert_eq!(nearby.len(), 1);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn lookup_failures_become_messages() {
        let failing = StubGeocoder {
            suggestions: Err(RecommendError::Geocoding("REQUEST_DENIED".to_string())),
            point: None,
        };
        let outcome = nearby_for_address(&failing, "x", &[], 5.0, 5);
        assert!(matches!(outcome, NearbyLookup::Failed(_)));
        assert!(outcome.message(5.0).unwrap().contains("REQUEST_DENIED"));

        let empty = StubGeocoder {
            suggestions: Ok(vec![]),
            point: None,
        };
        assert_eq!(nearby_for_address(&empty, "x", &[], 5.0, 5), NearbyLookup::NoSuggestions);

        let unknown = StubGeocoder {
            suggestions: Ok(vec!["Somewhere".to_string()]),
            point: None,
        };
        assert!(matches!(
            nearby_for_address(&unknown, "x", &[], 5.0, 5),
            NearbyLookup::NoCoordinates { .. }
        ));
    }

    #[test]
    fn api_status_maps_errors() {
        assert!(api_status("OK", None).is_ok());
        assert!(api_status("ZERO_RESULTS", None).is_ok());
        let err = api_status("OVER_QUERY_LIMIT", Some("slow down".to_string())).unwrap_err();
        assert_eq!(err.to_string(), "geocoding failed: OVER_QUERY_LIMIT: slow down");
    }
}
