use serde_json::json;

use crate::models::Coordinate;

const MAX_LINK_POINTS: usize = 30;
const OSM_ROOT: &str = "https://www.openstreetmap.org/";

/// geojson.io link drawing the route, thinned so the URL stays short.
///
/// Without geometry the link points OpenStreetMap at `center` instead.
pub fn route_map_link(geometry: &[Coordinate], center: Option<Coordinate>) -> String {
    if geometry.is_empty() {
        return match center {
            Some(c) => osm_point_link(c),
            None => OSM_ROOT.to_string(),
        };
    }

    let coordinates: Vec<[f64; 2]> = thin(geometry, MAX_LINK_POINTS)
        .into_iter()
        .map(|c| [c.lon, c.lat])
        .collect();
    let feature = json!({
        "type": "Feature",
        "properties": {},
        "geometry": {"type": "LineString", "coordinates": coordinates},
    });

    format!(
        "https://geojson.io/#data=data:application/json,{}",
        urlencoding::encode(&feature.to_string())
    )
}

pub fn osm_point_link(point: Coordinate) -> String {
    format!("{OSM_ROOT}?mlat={}&mlon={}&zoom=14", point.lat, point.lon)
}

/// Evenly sample at most `max_points` coordinates, keeping the first one.
fn thin(geometry: &[Coordinate], max_points: usize) -> Vec<Coordinate> {
    if geometry.len() <= max_points {
        return geometry.to_vec();
    }
    let step = geometry.len() as f64 / max_points as f64;
    (0..max_points)
        .map(|i| geometry[((i as f64 * step) as usize).min(geometry.len() - 1)])
        .collect()
}
