use async_trait::async_trait;

use crate::{error::UpstreamError, models::Coordinate};

/// Place name to coordinate lookup.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Coordinate, UpstreamError>;
}

/// Resolve a place name, collapsing every failure mode into `None`.
///
/// The reason is only logged; callers treat all of them as "not found".
pub async fn resolve(geocoder: &dyn Geocoder, place: &str) -> Option<Coordinate> {
    match geocoder.geocode(place).await {
        Ok(coord) => {
            tracing::info!("geocoded {place} -> ({:.4}, {:.4})", coord.lon, coord.lat);
            Some(coord)
        }
        Err(UpstreamError::RateLimited) => {
            tracing::error!("geocoding {place}: provider rate limit exceeded");
            None
        }
        Err(UpstreamError::Empty) => {
            tracing::warn!("geocoding {place}: no results");
            None
        }
        Err(err) => {
            tracing::warn!("geocoding {place} failed: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<Coordinate, fn() -> UpstreamError>);

    #[async_trait]
    impl Geocoder for Fixed {
        async fn geocode(&self, _query: &str) -> Result<Coordinate, UpstreamError> {
            self.0.map_err(|make| make())
        }
    }

    #[tokio::test]
    async fn found_coordinate_is_returned() {
        let geocoder = Fixed(Ok(Coordinate::new(37.62, 55.75)));
        assert_eq!(
            resolve(&geocoder, "Москва").await,
            Some(Coordinate::new(37.62, 55.75))
        );
    }

    #[tokio::test]
    async fn every_failure_is_not_found() {
        let failures: [fn() -> UpstreamError; 4] = [
            || UpstreamError::RateLimited,
            || UpstreamError::Empty,
            || UpstreamError::Malformed("no coordinates".into()),
            || UpstreamError::Status {
                status: 500,
                body: String::new(),
            },
        ];
        for make in failures {
            assert_eq!(resolve(&Fixed(Err(make)), "Неизвестный Город").await, None);
        }
    }
}
