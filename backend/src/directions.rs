use async_trait::async_trait;
use serde::Deserialize;

use crate::{error::UpstreamError, models::Coordinate, surface::RawSegment};

/// Directions response normalized to the one shape the pipeline works with.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRoute {
    pub distance_m: f64,
    pub segments: Vec<RawSegment>,
    pub geometry: Vec<Coordinate>,
}

/// Round-trip routing through an ordered list of waypoints, with surface
/// classification extras.
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    async fn round_trip(&self, waypoints: &[Coordinate]) -> Result<RawRoute, UpstreamError>;
}

/// The provider answers either with GeoJSON features or with flat routes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DirectionsPayload {
    GeoJson { features: Vec<GeoJsonRoute> },
    Flat { routes: Vec<FlatRoute> },
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeoJsonRoute {
    geometry: LineString,
    #[serde(default)]
    properties: RouteProperties,
}

#[derive(Debug, Default, Deserialize)]
struct RouteProperties {
    #[serde(default)]
    summary: Summary,
    #[serde(default)]
    extras: Extras,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FlatRoute {
    #[serde(default)]
    summary: Summary,
    #[serde(default)]
    extras: Extras,
    #[serde(default)]
    geometry: Option<FlatGeometry>,
}

/// Flat responses carry an encoded polyline unless GeoJSON geometry was
/// requested; only the latter is decoded.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlatGeometry {
    Line(LineString),
    Encoded(#[allow(dead_code)] String),
}

#[derive(Debug, Default, Deserialize)]
struct LineString {
    #[serde(default)]
    coordinates: Vec<Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct Summary {
    #[serde(default)]
    distance: f64,
}

#[derive(Debug, Default, Deserialize)]
struct Extras {
    #[serde(default)]
    surface: Option<ExtraInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct ExtraInfo {
    #[serde(default)]
    values: Vec<Vec<f64>>,
}

impl DirectionsPayload {
    pub(crate) fn into_raw_route(self) -> Result<RawRoute, UpstreamError> {
        let (summary, extras, line) = match self {
            Self::GeoJson { features } => {
                let route = features.into_iter().next().ok_or(UpstreamError::Empty)?;
                (
                    route.properties.summary,
                    route.properties.extras,
                    route.geometry,
                )
            }
            Self::Flat { routes } => {
                let route = routes.into_iter().next().ok_or(UpstreamError::Empty)?;
                let line = match route.geometry {
                    Some(FlatGeometry::Line(line)) => line,
                    Some(FlatGeometry::Encoded(_)) | None => LineString::default(),
                };
                (route.summary, route.extras, line)
            }
        };

        Ok(RawRoute {
            distance_m: summary.distance,
            segments: extras.surface.map(to_segments).unwrap_or_default(),
            geometry: to_coordinates(line),
        })
    }
}

fn to_segments(info: ExtraInfo) -> Vec<RawSegment> {
    info.values
        .into_iter()
        .filter(|value| value.len() >= 3)
        .map(|value| {
            let code = if value[2].fract() == 0.0 {
                value[2] as i64
            } else {
                0
            };
            RawSegment::new(value[0], value[1], code)
        })
        .collect()
}

fn to_coordinates(line: LineString) -> Vec<Coordinate> {
    line.coordinates
        .into_iter()
        .filter(|position| position.len() >= 2)
        .map(|position| Coordinate::new(position[0], position[1]))
        .collect()
}
