use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;

use crate::{
    catalog::{StaticRouteCatalog, DEFAULT_TOLERANCE_KM},
    directions::DirectionsProvider,
    error::UpstreamError,
    generator::{Direction, RouteGenerator},
    geocoding::{self, Geocoder},
    matcher::{into_routes, rank, DEFAULT_MATCH_THRESHOLD, MAX_LIVE_RESULTS},
    models::{Route, SearchCriteria},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchPolicy {
    pub tolerance_km: f64,
    pub match_threshold: f64,
    pub max_live_results: usize,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            tolerance_km: DEFAULT_TOLERANCE_KM,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            max_live_results: MAX_LIVE_RESULTS,
        }
    }
}

/// Geocoder plus round-trip generator; present only when provider
/// credentials are configured.
pub struct LiveRouting {
    geocoder: Arc<dyn Geocoder>,
    generator: RouteGenerator,
}

impl LiveRouting {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        directions: Arc<dyn DirectionsProvider>,
        reference_latitude: f64,
    ) -> Self {
        Self {
            geocoder,
            generator: RouteGenerator::new(directions, reference_latitude),
        }
    }

    /// One client serving both geocoding and directions.
    pub fn from_client<C>(client: C, reference_latitude: f64) -> Self
    where
        C: Geocoder + DirectionsProvider + 'static,
    {
        let client = Arc::new(client);
        Self::new(client.clone(), client, reference_latitude)
    }
}

/// Live generation with catalog fallback.
///
/// Built once at startup and shared by every session.
pub struct RouteDiscoveryService {
    live: Option<LiveRouting>,
    catalog: Arc<StaticRouteCatalog>,
    policy: SearchPolicy,
}

impl RouteDiscoveryService {
    pub fn new(catalog: Arc<StaticRouteCatalog>, policy: SearchPolicy) -> Self {
        Self {
            live: None,
            catalog,
            policy,
        }
    }

    pub fn with_live_routing(mut self, live: LiveRouting) -> Self {
        self.live = Some(live);
        self
    }

    pub fn has_live_routing(&self) -> bool {
        self.live.is_some()
    }

    pub fn catalog(&self) -> &StaticRouteCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> SearchPolicy {
        self.policy
    }

    /// Live candidates when the provider yields any, catalog matches
    /// otherwise. Never fails: upstream problems only change the source.
    pub async fn search(&self, criteria: &SearchCriteria) -> Vec<Route> {
        if let Some(live) = &self.live {
            let routes = AssertUnwindSafe(self.search_live(live, criteria))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    tracing::error!("{} for {}", UpstreamError::Panicked, criteria.city);
                    Vec::new()
                });
            if !routes.is_empty() {
                tracing::info!(
                    "live routing found {} route(s) for {} {:.1} km {}",
                    routes.len(),
                    criteria.city,
                    criteria.distance_km,
                    criteria.surface_type
                );
                return routes;
            }
            tracing::info!("live routing yielded nothing for {}, using catalog", criteria.city);
        }

        let routes = self.catalog.filter(criteria, self.policy.tolerance_km);
        tracing::info!(
            "catalog returned {} route(s) for {} {:.1} km {}",
            routes.len(),
            criteria.city,
            criteria.distance_km,
            criteria.surface_type
        );
        routes
    }

    async fn search_live(&self, live: &LiveRouting, criteria: &SearchCriteria) -> Vec<Route> {
        let Some(center) = geocoding::resolve(live.geocoder.as_ref(), &criteria.city).await else {
            return Vec::new();
        };

        let candidates = live
            .generator
            .generate(center, criteria.distance_km, &Direction::ALL)
            .await
            .into_iter()
            .map(|generated| generated.into_candidate(&criteria.city))
            .collect();

        into_routes(rank(
            candidates,
            criteria.surface_type,
            self.policy.match_threshold,
            self.policy.max_live_results,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        directions::RawRoute,
        generator::DEFAULT_REFERENCE_LATITUDE,
        models::{Coordinate, SurfaceProduct},
        surface::RawSegment,
    };

    const SAMPLE: &str = include_str!("../data/routes.json");

    fn catalog() -> Arc<StaticRouteCatalog> {
        Arc::new(StaticRouteCatalog::from_reader(SAMPLE.as_bytes()).unwrap())
    }

    fn criteria(city: &str, distance_km: f64, surface_type: SurfaceProduct) -> SearchCriteria {
        SearchCriteria {
            city: city.into(),
            distance_km,
            surface_type,
        }
    }

    struct KnownCities;

    #[async_trait]
    impl Geocoder for KnownCities {
        async fn geocode(&self, query: &str) -> Result<Coordinate, UpstreamError> {
            match query {
                "Москва" => Ok(Coordinate::new(37.6173, 55.7558)),
                _ => Err(UpstreamError::Empty),
            }
        }
    }

    enum Behaviour {
        ParkHeavy,
        Fail,
        Panic,
    }

    struct Directions {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl Directions {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DirectionsProvider for Directions {
        async fn round_trip(&self, waypoints: &[Coordinate]) -> Result<RawRoute, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::ParkHeavy => Ok(RawRoute {
                    distance_m: 9_800.0,
                    segments: vec![RawSegment::new(0.0, 80.0, 17), RawSegment::new(80.0, 100.0, 3)],
                    geometry: waypoints.to_vec(),
                }),
                Behaviour::Fail => Err(UpstreamError::Status {
                    status: 503,
                    body: "busy".into(),
                }),
                Behaviour::Panic => panic!("directions provider exploded"),
            }
        }
    }

    fn live_service(directions: Arc<Directions>) -> RouteDiscoveryService {
        RouteDiscoveryService::new(catalog(), SearchPolicy::default()).with_live_routing(
            LiveRouting::new(Arc::new(KnownCities), directions, DEFAULT_REFERENCE_LATITUDE),
        )
    }

    #[tokio::test]
    async fn catalog_only_service_filters_catalog() {
        let service = RouteDiscoveryService::new(catalog(), SearchPolicy::default());
        let wanted = criteria("Москва", 10.0, SurfaceProduct::Park);

        let routes = service.search(&wanted).await;

        assert_eq!(routes, service.catalog().filter(&wanted, DEFAULT_TOLERANCE_KM));
        let ids: Vec<_> = routes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["msk-sokolniki", "msk-izmailovo", "msk-vdnkh"]);
    }

    #[tokio::test]
    async fn catalog_only_service_may_return_nothing() {
        let service = RouteDiscoveryService::new(catalog(), SearchPolicy::default());
        assert!(service
            .search(&criteria("Санкт-Петербург", 40.0, SurfaceProduct::Trail))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn live_routes_win_when_provider_answers() {
        let directions = Directions::new(Behaviour::ParkHeavy);
        let service = live_service(directions.clone());

        let routes = service
            .search(&criteria("Москва", 10.0, SurfaceProduct::Park))
            .await;

        assert_eq!(directions.calls.load(Ordering::SeqCst), 4);
        assert_eq!(routes.len(), MAX_LIVE_RESULTS);
        assert!(routes.iter().all(|r| r.id.starts_with("live-")));
        assert!(routes.iter().all(|r| r.surface_type == SurfaceProduct::Park));
    }

    #[tokio::test]
    async fn unknown_city_falls_back_to_catalog_without_directions_calls() {
        let directions = Directions::new(Behaviour::ParkHeavy);
        let service = live_service(directions.clone());

        let routes = service
            .search(&criteria("Неизвестный Город", 10.0, SurfaceProduct::Park))
            .await;

        assert!(routes.is_empty());
        assert_eq!(directions.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_directions_fall_back_to_catalog() {
        let service = live_service(Directions::new(Behaviour::Fail));
        let wanted = criteria("Москва", 7.0, SurfaceProduct::Embankment);

        let routes = service.search(&wanted).await;

        let ids: Vec<_> = routes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["msk-frunzenskaya"]);
    }

    #[tokio::test]
    async fn panicking_provider_still_reaches_catalog() {
        let service = live_service(Directions::new(Behaviour::Panic));
        let wanted = criteria("Москва", 6.0, SurfaceProduct::Trail);

        let routes = service.search(&wanted).await;

        assert_eq!(routes, service.catalog().filter(&wanted, DEFAULT_TOLERANCE_KM));
        assert_eq!(routes[0].id, "msk-vorobyovy");
    }
}
