use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Args;

use crate::{
    catalog::{StaticRouteCatalog, DEFAULT_TOLERANCE_KM},
    conversation::ConversationStateMachine,
    discovery::{LiveRouting, RouteDiscoveryService, SearchPolicy},
    error::UpstreamError,
    generator::DEFAULT_REFERENCE_LATITUDE,
    matcher::{DEFAULT_MATCH_THRESHOLD, MAX_LIVE_RESULTS},
    ors::{OrsClient, DEFAULT_BASE_URL},
};

pub const DEFAULT_ROUTES_FILE: &str = "backend/data/routes.json";
pub const FALLBACK_CITIES: [&str; 2] = ["Москва", "Санкт-Петербург"];

/// Settings shared by the HTTP server and the console front end.
///
/// Every flag falls back to an environment variable, so a `.env` file is
/// enough to configure a deployment.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// JSON file with the curated route catalog
    #[arg(long, env = "ROUTES_FILE", default_value = DEFAULT_ROUTES_FILE)]
    pub routes_file: PathBuf,

    /// OpenRouteService API key; live routing is disabled without it
    #[arg(long, env = "OPENROUTESERVICE_API_KEY", hide_env_values = true)]
    pub ors_api_key: Option<String>,

    #[arg(long, env = "ORS_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub ors_base_url: String,

    /// Comma-separated cities offered in the dialogue (defaults to catalog cities)
    #[arg(long, env = "ALLOWED_CITIES", value_delimiter = ',')]
    pub cities: Vec<String>,

    /// Accepted catalog distance deviation, km
    #[arg(long, default_value_t = DEFAULT_TOLERANCE_KM)]
    pub tolerance_km: f64,

    /// Minimum share of the requested surface for a live route
    #[arg(long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
    pub match_threshold: f64,

    /// Upper bound for each provider request, seconds
    #[arg(long, default_value_t = 15)]
    pub http_timeout_secs: u64,

    /// Latitude used to scale longitude offsets of turnaround points
    #[arg(long, default_value_t = DEFAULT_REFERENCE_LATITUDE)]
    pub reference_latitude: f64,

    /// Idle time after which an unfinished search is forgotten, seconds
    #[arg(long, env = "SESSION_TTL_SECS", default_value_t = 1800)]
    pub session_ttl_secs: u64,
}

impl Settings {
    pub fn policy(&self) -> SearchPolicy {
        SearchPolicy {
            tolerance_km: self.tolerance_km,
            match_threshold: self.match_threshold,
            max_live_results: MAX_LIVE_RESULTS,
        }
    }

    pub fn load_catalog(&self) -> StaticRouteCatalog {
        StaticRouteCatalog::from_file_or_empty(&self.routes_file)
    }

    /// Configured cities, else the catalog's, else a built-in pair.
    pub fn cities(&self, catalog: &StaticRouteCatalog) -> Vec<String> {
        let configured: Vec<String> = self
            .cities
            .iter()
            .map(|city| city.trim().to_string())
            .filter(|city| !city.is_empty())
            .collect();
        if !configured.is_empty() {
            return configured;
        }
        let from_catalog = catalog.cities();
        if !from_catalog.is_empty() {
            return from_catalog;
        }
        FALLBACK_CITIES.iter().map(|city| city.to_string()).collect()
    }

    pub fn ors_client(&self) -> Result<Option<OrsClient>, UpstreamError> {
        let Some(api_key) = self.ors_api_key.as_deref().filter(|key| !key.trim().is_empty())
        else {
            return Ok(None);
        };
        OrsClient::new(
            api_key.trim(),
            self.ors_base_url.as_str(),
            Duration::from_secs(self.http_timeout_secs),
        )
        .map(Some)
    }

    pub fn discovery(&self) -> Result<RouteDiscoveryService, UpstreamError> {
        let catalog = Arc::new(self.load_catalog());
        let service = RouteDiscoveryService::new(catalog, self.policy());
        Ok(match self.ors_client()? {
            Some(client) => {
                tracing::info!("live routing enabled via {}", self.ors_base_url);
                service.with_live_routing(LiveRouting::from_client(client, self.reference_latitude))
            }
            None => {
                tracing::warn!("no OpenRouteService key configured, serving catalog routes only");
                service
            }
        })
    }

    pub fn conversation(
        &self,
        discovery: Arc<RouteDiscoveryService>,
    ) -> ConversationStateMachine {
        let cities = self.cities(discovery.catalog());
        ConversationStateMachine::new(
            discovery,
            cities,
            Duration::from_secs(self.session_ttl_secs),
        )
    }
}
