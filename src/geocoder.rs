//! # Reverse Geocoder
//!
//! Resolves a coordinate to a short, human-readable place name for the
//! success DM (spec.md §6). Never surfaces an error to its caller — a
//! geocoding failure just omits the place name from the notification.

use crate::constants::{GEOCODER_HTTP_TIMEOUT, GEOCODER_RATE_LIMIT};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Instant;

const USER_AGENT: &str = "osmnotes-gateway/1.0 (LoRa mesh store-and-forward bot)";
const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";
const ADDRESS_LEVELS: &[&str] = &["neighbourhood", "suburb", "city_district", "city", "town", "state", "country"];
const MAX_LEVELS: usize = 5;

#[derive(Deserialize)]
struct ReverseGeocodeResponse {
    address: Option<serde_json::Map<String, serde_json::Value>>,
}

pub struct Geocoder {
    http: reqwest::Client,
    last_request: Mutex<Option<Instant>>,
}

impl Geocoder {
    pub fn new(http: reqwest::Client) -> Self {
        Geocoder {
            http,
            last_request: Mutex::new(None),
        }
    }

    /// Resolves `(lat, lon)` to a short address hierarchy, e.g.
    /// `"La Candelaria, Bogotá, Colombia"`. Returns `None` on any failure
    /// (timeout, non-200, malformed body, or an empty address).
    pub async fn reverse(&self, lat: f64, lon: f64) -> Option<String> {
        self.wait_for_rate_gate().await;

        let response = self
            .http
            .get(NOMINATIM_URL)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("accept-language", "es".to_string()),
            ])
            .header("User-Agent", USER_AGENT)
            .timeout(GEOCODER_HTTP_TIMEOUT)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            return None;
        }
        let parsed: ReverseGeocodeResponse = response.json().await.ok()?;
        let address = parsed.address?;

        let mut parts = Vec::new();
        for level in ADDRESS_LEVELS {
            if let Some(value) = address.get(*level).and_then(|v| v.as_str()) {
                if parts.last().map(|p: &String| p.as_str()) != Some(value) {
                    parts.push(value.to_string());
                }
                if parts.len() >= MAX_LEVELS {
                    break;
                }
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }

    async fn wait_for_rate_gate(&self) {
        let wait = {
            let guard = self.last_request.lock().unwrap();
            guard.and_then(|last| {
                let elapsed = last.elapsed();
                (elapsed < GEOCODER_RATE_LIMIT).then(|| GEOCODER_RATE_LIMIT - elapsed)
            })
        };
        if let Some(d) = wait {
            tokio::time::sleep(d).await;
        }
        *self.last_request.lock().unwrap() = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_adjacent_equal_address_levels() {
        let mut map = serde_json::Map::new();
        map.insert("city".to_string(), serde_json::json!("Bogotá"));
        map.insert("town".to_string(), serde_json::json!("Bogotá"));
        map.insert("country".to_string(), serde_json::json!("Colombia"));

        let mut parts = Vec::new();
        for level in ADDRESS_LEVELS {
            if let Some(value) = map.get(*level).and_then(|v| v.as_str()) {
                if parts.last().map(|p: &String| p.as_str()) != Some(value) {
                    parts.push(value.to_string());
                }
            }
        }
        assert_eq!(parts, vec!["Bogotá", "Colombia"]);
    }
}
