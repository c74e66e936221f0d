use std::sync::Arc;

use futures::future::join_all;

use crate::{
    directions::{DirectionsProvider, RawRoute},
    map_links::route_map_link,
    models::{Coordinate, Route},
    surface::{classify, SurfaceShare},
};

const EARTH_RADIUS_KM: f64 = 6_371.0;
const KM_PER_DEGREE_LAT: f64 = 111.0;
/// Moscow-area latitude; east/west displacements are only accurate near it.
pub const DEFAULT_REFERENCE_LATITUDE: f64 = 55.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit vector as (east, north).
    fn unit(self) -> (f64, f64) {
        match self {
            Self::North => (0.0, 1.0),
            Self::East => (1.0, 0.0),
            Self::South => (0.0, -1.0),
            Self::West => (-1.0, 0.0),
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::East => "east",
            Self::South => "south",
            Self::West => "west",
        }
    }

    fn heading(self) -> &'static str {
        match self {
            Self::North => "на север",
            Self::East => "на восток",
            Self::South => "на юг",
            Self::West => "на запад",
        }
    }
}

/// Point `distance_km / 2` away from `center` in `direction`, using the flat
/// 111 km per degree approximation scaled by the reference latitude.
pub fn turnaround_point(
    center: Coordinate,
    distance_km: f64,
    direction: Direction,
    reference_latitude: f64,
) -> Coordinate {
    let half = distance_km / 2.0;
    let (east, north) = direction.unit();
    let km_per_degree_lon = KM_PER_DEGREE_LAT * reference_latitude.to_radians().cos().abs().max(0.01);
    center.offset(
        east * half / km_per_degree_lon,
        north * half / KM_PER_DEGREE_LAT,
    )
}

/// Closed three-point path: center → turnaround → center.
pub fn round_trip_waypoints(
    center: Coordinate,
    distance_km: f64,
    direction: Direction,
    reference_latitude: f64,
) -> [Coordinate; 3] {
    let turnaround = turnaround_point(center, distance_km, direction, reference_latitude);
    [center, turnaround, center]
}

pub fn approximate_distance_km(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Provider answer for one direction, before classification.
#[derive(Debug, Clone)]
pub struct GeneratedRoute {
    pub direction: Direction,
    pub waypoints: [Coordinate; 3],
    pub requested_km: f64,
    pub raw: RawRoute,
}

/// Live route annotated with its surface composition.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub direction: Direction,
    pub route: Route,
    pub share: SurfaceShare,
}

impl GeneratedRoute {
    pub fn into_candidate(self, city: &str) -> Candidate {
        let share = classify(&self.raw.segments);
        let center = self.waypoints[0];

        let measured_km = if self.raw.distance_m > 0.0 {
            self.raw.distance_m / 1000.0
        } else {
            approximate_distance_km(&self.raw.geometry)
        };
        let distance_km = if measured_km > 0.0 {
            (measured_km * 10.0).round() / 10.0
        } else {
            self.requested_km
        };

        let mut composition: Vec<_> = share.iter().collect();
        composition.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let features = composition
            .into_iter()
            .map(|(product, ratio)| format!("{} {:.0}%", product.label(), ratio * 100.0))
            .collect();

        let route = Route {
            id: format!("live-{}", self.direction.id()),
            city: city.to_string(),
            name: format!("Круговой маршрут {}", self.direction.heading()),
            distance_km,
            surface_type: share.dominant(),
            description: format!(
                "Туда и обратно через точку разворота в {:.1} км {}",
                self.requested_km / 2.0,
                self.direction.heading()
            ),
            features,
            map_link: Some(route_map_link(&self.raw.geometry, Some(center))),
        };

        Candidate {
            direction: self.direction,
            route,
            share,
        }
    }
}

/// Requests one walking round trip per direction from the provider.
pub struct RouteGenerator {
    provider: Arc<dyn DirectionsProvider>,
    reference_latitude: f64,
}

impl RouteGenerator {
    pub fn new(provider: Arc<dyn DirectionsProvider>, reference_latitude: f64) -> Self {
        Self {
            provider,
            reference_latitude,
        }
    }

    /// Results keep the order of `directions`; failed directions are skipped.
    pub async fn generate(
        &self,
        center: Coordinate,
        distance_km: f64,
        directions: &[Direction],
    ) -> Vec<GeneratedRoute> {
        let requests = directions.iter().map(|&direction| async move {
            let waypoints =
                round_trip_waypoints(center, distance_km, direction, self.reference_latitude);
            match self.provider.round_trip(&waypoints).await {
                Ok(raw) => {
                    tracing::debug!(
                        "{} round trip: {:.0} m, {} surface segments",
                        direction.id(),
                        raw.distance_m,
                        raw.segments.len()
                    );
                    Some(GeneratedRoute {
                        direction,
                        waypoints,
                        requested_km: distance_km,
                        raw,
                    })
                }
                Err(err) => {
                    tracing::warn!("{} round trip skipped: {err}", direction.id());
                    None
                }
            }
        });

        join_all(requests).await.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::{error::UpstreamError, models::SurfaceProduct, surface::RawSegment};

    const MOSCOW: Coordinate = Coordinate {
        lon: 37.6173,
        lat: 55.7558,
    };

    /// Fails for turnarounds west of the center, records every request.
    struct WestBlocked {
        calls: Mutex<Vec<Vec<Coordinate>>>,
    }

    #[async_trait]
    impl DirectionsProvider for WestBlocked {
        async fn round_trip(&self, waypoints: &[Coordinate]) -> Result<RawRoute, UpstreamError> {
            self.calls.lock().unwrap().push(waypoints.to_vec());
            if waypoints[1].lon < waypoints[0].lon {
                return Err(UpstreamError::RateLimited);
            }
            Ok(RawRoute {
                distance_m: 10_040.0,
                segments: vec![RawSegment::new(0.0, 70.0, 17), RawSegment::new(70.0, 100.0, 3)],
                geometry: waypoints.to_vec(),
            })
        }
    }

    #[test]
    fn test_turnaround_north_moves_latitude_only() {
        let point = turnaround_point(MOSCOW, 10.0, Direction::North, DEFAULT_REFERENCE_LATITUDE);
        assert!((point.lat - (MOSCOW.lat + 5.0 / 111.0)).abs() < 1e-12);
        assert_eq!(point.lon, MOSCOW.lon);
    }

    #[test]
    fn test_turnaround_west_scales_by_reference_latitude() {
        let point = turnaround_point(MOSCOW, 10.0, Direction::West, DEFAULT_REFERENCE_LATITUDE);
        let expected = 5.0 / (111.0 * 55.0_f64.to_radians().cos());
        assert!((MOSCOW.lon - point.lon - expected).abs() < 1e-12);
        assert_eq!(point.lat, MOSCOW.lat);
    }

    #[test]
    fn test_turnaround_is_roughly_half_distance_near_reference() {
        for direction in Direction::ALL {
            let point = turnaround_point(MOSCOW, 10.0, direction, DEFAULT_REFERENCE_LATITUDE);
            let km = haversine_km(MOSCOW, point);
            assert!((km - 5.0).abs() < 0.1, "{direction:?}: {km}");
        }
    }

    #[test]
    fn test_haversine_same_point() {
        assert_eq!(haversine_km(MOSCOW, MOSCOW), 0.0);
    }

    #[test]
    fn test_approximate_distance_single_point() {
        assert_eq!(approximate_distance_km(&[MOSCOW]), 0.0);
        assert_eq!(approximate_distance_km(&[]), 0.0);
    }

    #[tokio::test]
    async fn test_generate_skips_failed_direction_and_keeps_order() {
        let provider = Arc::new(WestBlocked {
            calls: Mutex::new(Vec::new()),
        });
        let generator = RouteGenerator::new(provider.clone(), DEFAULT_REFERENCE_LATITUDE);

        let routes = generator.generate(MOSCOW, 10.0, &Direction::ALL).await;

        let directions: Vec<_> = routes.iter().map(|r| r.direction).collect();
        assert_eq!(
            directions,
            vec![Direction::North, Direction::East, Direction::South]
        );
        assert_eq!(provider.calls.lock().unwrap().len(), 4);
        for waypoints in provider.calls.lock().unwrap().iter() {
            assert_eq!(waypoints.len(), 3);
            assert_eq!(waypoints[0], waypoints[2]);
        }
    }

    #[tokio::test]
    async fn test_candidate_carries_share_and_dominant_surface() {
        let provider = Arc::new(WestBlocked {
            calls: Mutex::new(Vec::new()),
        });
        let generator = RouteGenerator::new(provider, DEFAULT_REFERENCE_LATITUDE);
        let generated = generator.generate(MOSCOW, 10.0, &[Direction::North]).await;

        let candidate = generated.into_iter().next().unwrap().into_candidate("Москва");
        assert_eq!(candidate.route.id, "live-north");
        assert_eq!(candidate.route.city, "Москва");
        assert_eq!(candidate.route.distance_km, 10.0);
        assert_eq!(candidate.route.surface_type, SurfaceProduct::Park);
        assert_eq!(candidate.route.features, vec!["Парк 70%", "Асфальт 30%"]);
        assert!((candidate.share.ratio(SurfaceProduct::Park) - 0.7).abs() < 1e-9);
        assert!(candidate.route.map_link.unwrap().starts_with("https://geojson.io/"));
    }

    #[test]
    fn test_candidate_without_distance_uses_requested() {
        let generated = GeneratedRoute {
            direction: Direction::South,
            waypoints: [MOSCOW; 3],
            requested_km: 7.5,
            raw: RawRoute::default(),
        };
        let candidate = generated.into_candidate("Москва");
        assert_eq!(candidate.route.distance_km, 7.5);
        assert_eq!(candidate.route.surface_type, SurfaceProduct::Asphalt);
        assert_eq!(
            candidate.route.map_link.as_deref(),
            Some("https://www.openstreetmap.org/?mlat=55.7558&mlon=37.6173&zoom=14")
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn valid_coord() -> impl Strategy<Value = Coordinate> {
            (-180.0..=180.0, -80.0..=80.0).prop_map(|(lon, lat)| Coordinate { lon, lat })
        }

        fn direction() -> impl Strategy<Value = Direction> {
            prop::sample::select(Direction::ALL.to_vec())
        }

        proptest! {
            #[test]
            fn prop_round_trip_is_closed_three_point_path(
                center in valid_coord(),
                distance in 1.0..=50.0f64,
                direction in direction(),
                reference in -80.0..=80.0f64
            ) {
                let path = round_trip_waypoints(center, distance, direction, reference);
                prop_assert_eq!(path.len(), 3);
                prop_assert_eq!(path[0], path[2]);
                prop_assert_eq!(path[0], center);
                prop_assert!(path[1] != center);
            }

            #[test]
            fn prop_haversine_symmetric(a in valid_coord(), b in valid_coord()) {
                prop_assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-10);
            }

            #[test]
            fn prop_approximate_distance_non_negative(
                coords in prop::collection::vec(valid_coord(), 0..10)
            ) {
                prop_assert!(approximate_distance_km(&coords) >= 0.0);
            }
        }
    }
}
