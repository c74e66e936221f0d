use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::{
    directions::{DirectionsPayload, DirectionsProvider, RawRoute},
    error::UpstreamError,
    geocoding::Geocoder,
    models::Coordinate,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openrouteservice.org";
const DIRECTIONS_PROFILE: &str = "foot-walking";

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<GeocodeFeature>,
}

#[derive(Debug, Deserialize)]
struct GeocodeFeature {
    geometry: Option<PointGeometry>,
}

#[derive(Debug, Deserialize)]
struct PointGeometry {
    #[serde(default)]
    coordinates: Vec<f64>,
}

/// OpenRouteService client for geocoding and walking round trips.
///
/// Every call is a single attempt bounded by the client timeout.
#[derive(Clone)]
pub struct OrsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OrsClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn read_body(response: Response) -> Result<String, UpstreamError> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(UpstreamError::RateLimited);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl Geocoder for OrsClient {
    async fn geocode(&self, query: &str) -> Result<Coordinate, UpstreamError> {
        let url = format!("{}/geocode/search", self.base_url);
        let response = self
            .client
            .get(url)
            .query(&[("api_key", self.api_key.as_str()), ("text", query)])
            .send()
            .await?;
        let body = Self::read_body(response).await?;

        let payload: GeocodeResponse = serde_json::from_str(&body)
            .map_err(|err| UpstreamError::Malformed(err.to_string()))?;
        let feature = payload.features.into_iter().next().ok_or(UpstreamError::Empty)?;
        match feature.geometry.map(|geometry| geometry.coordinates) {
            Some(coords) if coords.len() >= 2 => Ok(Coordinate::new(coords[0], coords[1])),
            _ => Err(UpstreamError::Malformed(
                "geocode feature without coordinates".into(),
            )),
        }
    }
}

#[async_trait]
impl DirectionsProvider for OrsClient {
    async fn round_trip(&self, waypoints: &[Coordinate]) -> Result<RawRoute, UpstreamError> {
        let url = format!(
            "{}/v2/directions/{DIRECTIONS_PROFILE}/geojson",
            self.base_url
        );
        let coordinates: Vec<[f64; 2]> = waypoints.iter().map(|c| [c.lon, c.lat]).collect();
        let body = json!({
            "coordinates": coordinates,
            "extra_info": ["surface"],
        });

        let response = self
            .client
            .post(url)
            .header("Authorization", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let text = Self::read_body(response).await?;

        let payload: DirectionsPayload = serde_json::from_str(&text)
            .map_err(|err| UpstreamError::Malformed(err.to_string()))?;
        payload.into_raw_route()
    }
}
