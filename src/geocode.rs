use std::env;

use reqwest::Client;
use serde_json::Value;
use tracing::warn;

const UNKNOWN_LOCATION: &str = "Unknown location";

/// Reverse geocoder backed by the Google Maps Geocoding API. Without an API
/// key it degrades to a fixed placeholder address rather than failing
/// location updates.
pub struct Geocoder {
    client: Client,
    api_key: Option<String>,
}

impl Geocoder {
    pub fn new(api_key: Option<String>) -> Self {
        if api_key.is_none() {
            warn!("GOOGLE_MAPS_API_KEY not set, reverse geocoding disabled");
        }
        Self {
            client: Client::new(),
            api_key,
        }
    }

    pub fn from_env() -> Self {
        Self::new(env::var("GOOGLE_MAPS_API_KEY").ok())
    }

    pub async fn reverse(&self, lat: f64, lng: f64) -> Result<String, String> {
        let Some(api_key) = &self.api_key else {
            return Ok(UNKNOWN_LOCATION.to_string());
        };

        let response = self
            .client
            .get("https://maps.googleapis.com/maps/api/geocode/json")
            .query(&[
                ("latlng", format!("{},{}", lat, lng)),
                ("key", api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| format!("Geocode request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Geocode request failed: {}", response.status()));
        }

        let payload: Value = response.json().await.map_err(|e| e.to_string())?;
        let address = payload["results"][0]["formatted_address"]
            .as_str()
            .unwrap_or(UNKNOWN_LOCATION);
        Ok(address.to_string())
    }
}
