use reverse_geocoder::ReverseGeocoder;
use tracing::{debug, warn};

use super::{GeocodingClient, Place};

lazy_static::lazy_static! {
    static ref GEOCODER: ReverseGeocoder = ReverseGeocoder::new();
}

/// Nearest populated place from the bundled GeoNames cities table.
///
/// Works without network access, at the cost of resolving to the closest
/// town with more than 1000 inhabitants rather than a street address.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineGeocoder;

impl OfflineGeocoder {
    pub fn lookup(&self, latitude: f64, longitude: f64) -> Option<String> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }

        let result = GEOCODER.search((latitude, longitude));
        let record = result.record;
        debug!("Nearest place to {}, {}: {}", latitude, longitude, record.name);

        let parts: Vec<&str> = [&record.name, &record.admin1, &record.cc]
            .into_iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();

        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

impl GeocodingClient for OfflineGeocoder {
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Option<String> {
        self.lookup(latitude, longitude)
    }

    async fn search(&self, query: &str) -> Option<Place> {
        warn!("Offline geocoder cannot search for {:?}", query);
        None
    }
}
