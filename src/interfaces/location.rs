use crate::domain::geofence::Coordinate;
use crate::error::{MallError, Result};
use async_trait::async_trait;

/// Yields the current position of the tracked user.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinate>;
}

/// A position known up front, e.g. passed on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    position: Coordinate,
}

impl FixedLocation {
    pub fn new(position: Coordinate) -> Self {
        Self { position }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Coordinate> {
        let Coordinate {
            latitude,
            longitude,
        } = self.position;
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(MallError::LocationUnavailable(format!(
                "non-finite coordinate ({latitude}, {longitude})"
            )));
        }
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_location() {
        let provider = FixedLocation::new(Coordinate::new(13.0, 80.0));
        assert_eq!(
            provider.current_position().await.unwrap(),
            Coordinate::new(13.0, 80.0)
        );
    }

    #[tokio::test]
    async fn test_non_finite_location_is_unavailable() {
        let provider = FixedLocation::new(Coordinate::new(f64::NAN, 80.0));
        assert!(matches!(
            provider.current_position().await,
            Err(MallError::LocationUnavailable(_))
        ));
    }
}
