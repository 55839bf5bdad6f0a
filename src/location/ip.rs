use serde::Deserialize;
use tracing::{debug, warn};

use super::{
    Coordinates, LocationProvider, POSITION_UNAVAILABLE, PositionError, PositionOptions, TIMEOUT,
};

pub const IP_API_URL: &str = "http://ip-api.com/json";

/// IP lookups only resolve to roughly the city the address is registered in.
const IP_ACCURACY_METERS: f64 = 25_000.0;

#[derive(Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Approximate position from the public IP address of the caller (or of a
/// given address), via ip-api.com.
#[derive(Debug, Clone)]
pub struct IpLocationProvider {
    base_url: String,
    ip_address: Option<String>,
}

impl IpLocationProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ip_address: None,
        }
    }

    /// Looks up a specific address instead of the caller's own.
    pub fn for_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match &self.ip_address {
            Some(ip) => format!("{base}/{ip}"),
            None => format!("{base}/"),
        }
    }
}

impl Default for IpLocationProvider {
    fn default() -> Self {
        Self::new(IP_API_URL)
    }
}

fn transport_error(error: reqwest::Error) -> PositionError {
    if error.is_timeout() {
        PositionError::new(TIMEOUT, format!("IP lookup timed out: {error}"))
    } else {
        PositionError::new(POSITION_UNAVAILABLE, format!("IP lookup failed: {error}"))
    }
}

impl LocationProvider for IpLocationProvider {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinates, PositionError> {
        let url = self.url();
        debug!("Looking up IP location at {}", url);

        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(transport_error)?;

        let response = client.get(&url).send().await.map_err(transport_error)?;

        if !response.status().is_success() {
            warn!("IP lookup returned status {}", response.status());
            return Err(PositionError::new(
                POSITION_UNAVAILABLE,
                format!("IP lookup returned status {}", response.status()),
            ));
        }

        let body: IpApiResponse = response.json().await.map_err(transport_error)?;

        match (body.status.as_str(), body.lat, body.lon) {
            ("success", Some(latitude), Some(longitude)) => Ok(Coordinates {
                latitude,
                longitude,
                accuracy: IP_ACCURACY_METERS,
            }),
            _ => Err(PositionError::new(
                POSITION_UNAVAILABLE,
                body.message.unwrap_or_else(|| format!("IP lookup status: {}", body.status)),
            )),
        }
    }
}
