use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

pub mod fixed;
pub mod history;
pub mod ip;

pub use fixed::FixedLocationProvider;
pub use history::{HistoryLocationProvider, LocationHistory, LocationPoint};
pub use ip::IpLocationProvider;

/// Platform error code: the user refused location access.
pub const PERMISSION_DENIED: u16 = 1;
/// Platform error code: no position could be determined.
pub const POSITION_UNAVAILABLE: u16 = 2;
/// Platform error code: the request did not complete in time.
pub const TIMEOUT: u16 = 3;

/// A single position fix. Accuracy is the confidence radius in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

/// Options for a one-shot position query.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the provider may hand back instead of a fresh one.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(5 * 60),
        }
    }
}

/// Raw failure as reported by a location provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionError {
    pub code: u16,
    pub message: String,
}

impl PositionError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocateError {
    #[error("location is not supported on this platform")]
    UnsupportedPlatform,
    #[error("location permission denied: {0}")]
    PermissionDenied(String),
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),
    #[error("location request timed out: {0}")]
    Timeout(String),
    #[error("unknown location error: {0}")]
    Unknown(String),
}

impl LocateError {
    /// Maps a provider error code onto the error taxonomy.
    pub fn from_code(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            PERMISSION_DENIED => LocateError::PermissionDenied(message),
            POSITION_UNAVAILABLE => LocateError::PositionUnavailable(message),
            TIMEOUT => LocateError::Timeout(message),
            _ => LocateError::Unknown(message),
        }
    }
}

impl From<PositionError> for LocateError {
    fn from(error: PositionError) -> Self {
        LocateError::from_code(error.code, error.message)
    }
}

/// A capability that answers one-shot position queries.
pub trait LocationProvider {
    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<Coordinates, PositionError>>;
}

/// Issues a single position request and resolves with exactly one outcome.
///
/// `None` stands for a platform with no location capability at all; no
/// request is made in that case. The timeout from `options` is enforced
/// around the provider call as well as handed to the provider.
pub async fn locate_device<P: LocationProvider>(
    provider: Option<&P>,
    options: &PositionOptions,
) -> Result<Coordinates, LocateError> {
    let provider = provider.ok_or(LocateError::UnsupportedPlatform)?;

    debug!(
        "Requesting position (high accuracy: {}, timeout: {:?}, maximum age: {:?})",
        options.enable_high_accuracy, options.timeout, options.maximum_age
    );

    match tokio::time::timeout(options.timeout, provider.current_position(options)).await {
        Ok(Ok(coords)) => {
            debug!(
                "Position acquired: {}, {} (±{} m)",
                coords.latitude, coords.longitude, coords.accuracy
            );
            Ok(coords)
        }
        Ok(Err(error)) => Err(error.into()),
        Err(_) => Err(LocateError::from_code(
            TIMEOUT,
            format!("no position within {:?}", options.timeout),
        )),
    }
}

/// Provider selected at runtime from configuration.
#[derive(Debug)]
pub enum ConfiguredProvider {
    Ip(IpLocationProvider),
    Fixed(FixedLocationProvider),
    History(HistoryLocationProvider),
}

impl LocationProvider for ConfiguredProvider {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinates, PositionError> {
        match self {
            ConfiguredProvider::Ip(p) => p.current_position(options).await,
            ConfiguredProvider::Fixed(p) => p.current_position(options).await,
            ConfiguredProvider::History(p) => p.current_position(options).await,
        }
    }
}
