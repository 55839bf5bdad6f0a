use serde::Deserialize;
use tracing::{debug, warn};

use super::{GeocodeError, GeocodingClient, Place};

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
/// Nominatim rejects requests without an identifying user agent.
pub const USER_AGENT: &str = "PetNextDoorApp/1.0";

#[derive(Debug, Default, Deserialize)]
pub struct NominatimAddress {
    pub city: Option<String>,
    pub town: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReverseResponse {
    #[serde(default)]
    pub address: Option<NominatimAddress>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// "City, State, Country" from whichever parts are present, city falling back
/// to town. Without any part, the full display name is used instead.
pub fn format_address(response: &ReverseResponse) -> Option<String> {
    let parts: Vec<&str> = match &response.address {
        Some(address) => [
            present(&address.city).or_else(|| present(&address.town)),
            present(&address.state),
            present(&address.country),
        ]
        .into_iter()
        .flatten()
        .collect(),
        None => Vec::new(),
    };

    if parts.is_empty() {
        present(&response.display_name).map(str::to_owned)
    } else {
        Some(parts.join(", "))
    }
}

/// Client for a Nominatim instance (OpenStreetMap's by default).
#[derive(Debug, Clone)]
pub struct NominatimClient {
    base_url: String,
    client: reqwest::Client,
}

impl NominatimClient {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            client,
        })
    }

    async fn fetch_reverse(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ReverseResponse, GeocodeError> {
        let url = format!("{}/reverse", self.base_url);
        debug!("Reverse geocoding {}, {} via {}", latitude, longitude, url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("format", "json".to_owned()),
                ("addressdetails", "1".to_owned()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    async fn fetch_search(&self, query: &str) -> Result<Option<Place>, GeocodeError> {
        let url = format!("{}/search", self.base_url);
        debug!("Geocoding {:?} via {}", query, url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("limit", "1"),
                ("addressdetails", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }

        let results: Vec<SearchResult> = response.json().await?;
        let Some(best) = results.into_iter().next() else {
            return Ok(None);
        };

        let parse = |value: &str| {
            value
                .parse::<f64>()
                .map_err(|err| GeocodeError::InvalidResponse(format!("{value:?}: {err}")))
        };

        Ok(Some(Place {
            latitude: parse(best.lat.as_str())?,
            longitude: parse(best.lon.as_str())?,
            display_name: best.display_name.unwrap_or_else(|| query.to_owned()),
        }))
    }
}

impl GeocodingClient for NominatimClient {
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Option<String> {
        match self.fetch_reverse(latitude, longitude).await {
            Ok(response) => format_address(&response),
            Err(err) => {
                warn!("Error reverse geocoding {}, {}: {}", latitude, longitude, err);
                None
            }
        }
    }

    async fn search(&self, query: &str) -> Option<Place> {
        self.fetch_search(query).await.unwrap_or_else(|err| {
            warn!("Error geocoding address {:?}: {}", query, err);
            None
        })
    }
}
