//! Turning coordinates into place names and back.
//!
//! Lookups are best effort: every failure degrades to `None` and is only
//! logged, callers never see a geocoding error.

use serde::Serialize;
use std::future::Future;

pub mod nominatim;
pub mod offline;

pub use nominatim::{NominatimAddress, NominatimClient, ReverseResponse, format_address};
pub use offline::OfflineGeocoder;

/// A forward geocoding match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geocoder returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub trait GeocodingClient {
    /// Human-readable address for a position, if one can be found.
    fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> impl Future<Output = Option<String>>;

    /// Best match for a free-text address.
    fn search(&self, query: &str) -> impl Future<Output = Option<Place>>;
}

/// Geocoder backend selected at runtime from configuration.
#[derive(Debug)]
pub enum ConfiguredGeocoder {
    Nominatim(NominatimClient),
    Offline(OfflineGeocoder),
}

impl GeocodingClient for ConfiguredGeocoder {
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Option<String> {
        match self {
            ConfiguredGeocoder::Nominatim(c) => c.reverse_geocode(latitude, longitude).await,
            ConfiguredGeocoder::Offline(c) => c.reverse_geocode(latitude, longitude).await,
        }
    }

    async fn search(&self, query: &str) -> Option<Place> {
        match self {
            ConfiguredGeocoder::Nominatim(c) => c.search(query).await,
            ConfiguredGeocoder::Offline(c) => c.search(query).await,
        }
    }
}
