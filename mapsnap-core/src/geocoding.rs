use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::Coordinate;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);
// Nominatim's usage policy caps anonymous clients at one lookup per second
const MIN_LOOKUP_INTERVAL: Duration = Duration::from_secs(1);

/// Cache key with the coordinate quantized to 1e-5 degrees (roughly one
/// meter), so snapshots of the same point share a single lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PlaceKey {
    lat_e5: i64,
    lon_e5: i64,
}

impl PlaceKey {
    fn new(coord: Coordinate) -> Self {
        Self {
            lat_e5: (coord.lat * 1e5).round() as i64,
            lon_e5: (coord.lon * 1e5).round() as i64,
        }
    }
}

/// Blocking Nominatim reverse-geocoding client
///
/// Owns its HTTP client the same way [`crate::TileFetcher`] does, plus the
/// lookup cache and throttle state. Resolved places (including negative
/// answers, e.g. open ocean) are cached for the lifetime of the instance.
pub struct Geocoder {
    client: Client,
    places: Mutex<HashMap<PlaceKey, Option<String>>>,
    last_lookup: Mutex<Option<Instant>>,
}

impl Geocoder {
    /// Creates a geocoder with the project user agent and a request timeout
    pub fn new() -> Result<Self> {
        let user_agent = format!(
            "mapsnap/{} (https://github.com/dsorvik/mapsnap)",
            env!("CARGO_PKG_VERSION")
        );

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .context("Failed to build geocoding HTTP client")?;

        Ok(Self {
            client,
            places: Mutex::new(HashMap::new()),
            last_lookup: Mutex::new(None),
        })
    }

    /// Resolves a coordinate to a place name like
    /// "Seattle, Washington, United States"
    ///
    /// Failures are logged and degrade to None; a snapshot never fails on
    /// geocoding.
    pub fn resolve(&self, coord: Coordinate) -> Option<String> {
        let key = PlaceKey::new(coord);

        if let Some(cached) = self.places.lock().unwrap().get(&key) {
            log::debug!("Geocode cache hit for {},{}", coord.lon, coord.lat);
            return cached.clone();
        }

        self.throttle();

        match self.lookup(coord) {
            Ok(place) => {
                if place.is_none() {
                    log::debug!("No address found for {},{}", coord.lon, coord.lat);
                }
                self.places.lock().unwrap().insert(key, place.clone());
                place
            }
            Err(e) => {
                log::warn!("Geocoding failed: {}", e);
                None
            }
        }
    }

    /// Blocks until at least [`MIN_LOOKUP_INTERVAL`] has passed since the
    /// previous lookup
    fn throttle(&self) {
        let mut last = self.last_lookup.lock().unwrap();
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < MIN_LOOKUP_INTERVAL {
                std::thread::sleep(MIN_LOOKUP_INTERVAL - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    fn lookup(&self, coord: Coordinate) -> Result<Option<String>> {
        let url = format!(
            "https://nominatim.openstreetmap.org/reverse?lat={}&lon={}&format=json&zoom=10",
            coord.lat, coord.lon
        );

        log::debug!("Reverse geocoding via {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .context("Failed to send geocoding request")?;

        if !response.status().is_success() {
            anyhow::bail!("Geocoding request failed: HTTP {}", response.status());
        }

        let body = response
            .text()
            .context("Failed to read geocoding response")?;
        let parsed: NominatimResponse =
            serde_json::from_str(&body).context("Failed to parse geocoding response")?;

        Ok(parsed.address.as_ref().and_then(format_location))
    }
}

/// Nominatim API response structure
#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

/// Builds "locality, state, country" from whichever parts are present
fn format_location(address: &Address) -> Option<String> {
    let locality = address
        .city
        .as_deref()
        .or(address.town.as_deref())
        .or(address.village.as_deref())
        .or(address.hamlet.as_deref());

    let parts: Vec<&str> = [locality, address.state.as_deref(), address.country.as_deref()]
        .into_iter()
        .flatten()
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_location_full() {
        let address = Address {
            city: Some("Seattle".into()),
            state: Some("Washington".into()),
            country: Some("United States".into()),
            ..Default::default()
        };
        assert_eq!(
            format_location(&address),
            Some("Seattle, Washington, United States".into())
        );
    }

    #[test]
    fn test_format_location_prefers_city_over_village() {
        let address = Address {
            city: Some("Reykjavik".into()),
            village: Some("Should not appear".into()),
            country: Some("Iceland".into()),
            ..Default::default()
        };
        assert_eq!(format_location(&address), Some("Reykjavik, Iceland".into()));
    }

    #[test]
    fn test_format_location_town_fallback() {
        let address = Address {
            town: Some("Banff".into()),
            state: Some("Alberta".into()),
            country: Some("Canada".into()),
            ..Default::default()
        };
        assert_eq!(format_location(&address), Some("Banff, Alberta, Canada".into()));
    }

    #[test]
    fn test_format_location_empty() {
        assert_eq!(format_location(&Address::default()), None);
    }

    #[test]
    fn test_place_key_merges_nearby_points() {
        let a = PlaceKey::new(Coordinate {
            lon: -122.33210,
            lat: 47.60620,
        });
        let b = PlaceKey::new(Coordinate {
            lon: -122.332104,
            lat: 47.606199,
        });
        assert_eq!(a, b);
    }

    #[test]
    fn test_place_key_separates_distinct_points() {
        let a = PlaceKey::new(Coordinate {
            lon: -122.3321,
            lat: 47.6062,
        });
        let b = PlaceKey::new(Coordinate {
            lon: -122.3321,
            lat: 47.6063,
        });
        assert_ne!(a, b);

        // Sign matters on both axes
        let east = PlaceKey::new(Coordinate { lon: 2.3522, lat: 48.8566 });
        let west = PlaceKey::new(Coordinate { lon: -2.3522, lat: 48.8566 });
        assert_ne!(east, west);
    }
}
