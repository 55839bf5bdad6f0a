// Location history provider.
// Parses Google Maps Timeline (Takeout) location history and hands back the
// most recent recorded fix, provided it is recent enough to count as current.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::Deserialize;
use std::cmp::Ordering;
use std::fs::File;
use std::io::BufReader;
use std::time::Duration;
use tracing::debug;

use super::{Coordinates, LocationProvider, POSITION_UNAVAILABLE, PositionError, PositionOptions};

/// Takeout entries without an accuracy field are treated as this coarse.
const DEFAULT_ACCURACY_METERS: u32 = 100;

/// Represents a single point in time and space from Google Location History.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPoint {
    pub timestamp_ms: u64,
    pub latitude_e7: i32,
    pub longitude_e7: i32,
    pub accuracy: u32,
}

impl LocationPoint {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: f64::from(self.latitude_e7) / 1e7,
            longitude: f64::from(self.longitude_e7) / 1e7,
            accuracy: f64::from(self.accuracy),
        }
    }
}

impl Ord for LocationPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp_ms.cmp(&other.timestamp_ms)
    }
}

impl PartialOrd for LocationPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Holds a sorted collection of `LocationPoint` instances for efficient querying.
#[derive(Debug, Default)]
pub struct LocationHistory {
    /// Sorted by `timestamp_ms`.
    data: Vec<LocationPoint>,
}

// Deserializes a string timestamp into a u64.
fn parse_str_to_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = serde::Deserialize::deserialize(deserializer)?;
    s.parse::<u64>().map_err(serde::de::Error::custom)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TakeoutRoot {
    locations: Vec<TakeoutLocation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TakeoutLocation {
    #[serde(deserialize_with = "parse_str_to_u64")]
    timestamp_ms: u64,
    latitude_e7: i32,
    longitude_e7: i32,
    accuracy: Option<u32>,
}

impl LocationHistory {
    pub fn from_points(mut points: Vec<LocationPoint>) -> Self {
        points.sort_unstable();
        LocationHistory { data: points }
    }

    /// Loads location history from a Google Takeout JSON file.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open history file: {path}"))?;
        let root: TakeoutRoot = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse history file: {path}"))?;

        let points = root
            .locations
            .into_iter()
            .map(|loc| LocationPoint {
                timestamp_ms: loc.timestamp_ms,
                latitude_e7: loc.latitude_e7,
                longitude_e7: loc.longitude_e7,
                accuracy: loc.accuracy.unwrap_or(DEFAULT_ACCURACY_METERS),
            })
            .collect();

        Ok(Self::from_points(points))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Most recent point recorded at or before `timestamp_ms`.
    pub fn latest_at(&self, timestamp_ms: u64) -> Option<&LocationPoint> {
        let end = self.data.partition_point(|p| p.timestamp_ms <= timestamp_ms);
        end.checked_sub(1).map(|i| &self.data[i])
    }

    /// Latest fix recorded at or before `now_ms`, if it is no older than `maximum_age`.
    pub fn latest_fix(
        &self,
        now_ms: u64,
        maximum_age: Duration,
    ) -> Result<&LocationPoint, PositionError> {
        let latest = self.latest_at(now_ms).ok_or_else(|| {
            PositionError::new(POSITION_UNAVAILABLE, "location history has no recorded fix")
        })?;

        let age = Duration::from_millis(now_ms - latest.timestamp_ms);
        if age > maximum_age {
            return Err(PositionError::new(
                POSITION_UNAVAILABLE,
                format!("last recorded fix is {}s old", age.as_secs()),
            ));
        }
        Ok(latest)
    }
}

/// Serves the most recent point of a location history as the current position.
#[derive(Debug)]
pub struct HistoryLocationProvider {
    history: LocationHistory,
}

impl HistoryLocationProvider {
    pub fn new(history: LocationHistory) -> Self {
        Self { history }
    }

    pub fn from_json_file(path: &Utf8Path) -> Result<Self> {
        let history = LocationHistory::from_json_file(path)?;
        debug!("Loaded {} location history points from {}", history.len(), path);
        Ok(Self::new(history))
    }
}

impl LocationProvider for HistoryLocationProvider {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinates, PositionError> {
        let now_ms = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0);
        self.history
            .latest_fix(now_ms, options.maximum_age)
            .map(LocationPoint::coordinates)
    }
}
