use super::{Coordinates, LocationProvider, PositionError, PositionOptions};

/// Always reports the same, manually entered position.
#[derive(Debug, Clone)]
pub struct FixedLocationProvider {
    coords: Coordinates,
}

impl FixedLocationProvider {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            coords: Coordinates {
                latitude,
                longitude,
                accuracy: 0.0,
            },
        }
    }
}

impl LocationProvider for FixedLocationProvider {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Coordinates, PositionError> {
        Ok(self.coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_position() {
        let provider = FixedLocationProvider::new(52.37, 4.89);
        let coords = provider
            .current_position(&PositionOptions::default())
            .await
            .unwrap();
        assert_eq!(coords.latitude, 52.37);
        assert_eq!(coords.longitude, 4.89);
        assert_eq!(coords.accuracy, 0.0);
    }
}
