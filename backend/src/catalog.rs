use std::{
    collections::BTreeSet,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::{
    error::CatalogError,
    models::{Route, SearchCriteria},
};

pub const DEFAULT_TOLERANCE_KM: f64 = 2.0;
/// Slack for decimal distances such as 7.3 + 2.0 that are not exact in f64.
const DISTANCE_EPSILON_KM: f64 = 1e-9;

/// Curated routes loaded once at startup and never modified afterwards.
#[derive(Debug, Clone, Default)]
pub struct StaticRouteCatalog {
    routes: Vec<Route>,
}

impl StaticRouteCatalog {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Like [`from_file`](Self::from_file) but a missing or broken file
    /// yields an empty catalog.
    pub fn from_file_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::from_file(path) {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::warn!("route catalog {} unavailable: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Entries missing a mandatory field are skipped, not fatal.
    pub fn from_reader(reader: impl Read) -> Result<Self, CatalogError> {
        let entries: Vec<serde_json::Value> = serde_json::from_reader(reader)?;
        let total = entries.len();

        let routes: Vec<Route> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match parse_entry(entry) {
                Ok(route) => Some(route),
                Err(reason) => {
                    tracing::warn!("skipping catalog entry #{index}: {reason}");
                    None
                }
            })
            .collect();

        tracing::info!("loaded {} of {total} catalog routes", routes.len());
        Ok(Self { routes })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Distinct cities, sorted.
    pub fn cities(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|route| route.city.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Routes in the requested city with the requested surface whose distance
    /// lies within `tolerance_km` of the target, closest first.
    pub fn filter(&self, criteria: &SearchCriteria, tolerance_km: f64) -> Vec<Route> {
        let accepted = (criteria.distance_km - tolerance_km - DISTANCE_EPSILON_KM)
            ..=(criteria.distance_km + tolerance_km + DISTANCE_EPSILON_KM);
        let mut matches: Vec<(f64, &Route)> = self
            .routes
            .iter()
            .filter(|route| route.city == criteria.city && route.surface_type == criteria.surface_type)
            .filter(|route| accepted.contains(&route.distance_km))
            .map(|route| ((route.distance_km - criteria.distance_km).abs(), route))
            .collect();

        matches.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        matches.into_iter().map(|(_, route)| route.clone()).collect()
    }
}

fn parse_entry(entry: serde_json::Value) -> Result<Route, String> {
    let route: Route = serde_json::from_value(entry).map_err(|err| err.to_string())?;
    if route.id.trim().is_empty() || route.city.trim().is_empty() {
        return Err("empty id or city".into());
    }
    if !(route.distance_km.is_finite() && route.distance_km > 0.0) {
        return Err(format!("non-positive distance {}", route.distance_km));
    }
    Ok(route)
}
