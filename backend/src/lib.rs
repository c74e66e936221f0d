pub mod catalog;
pub mod config;
pub mod conversation;
pub mod directions;
pub mod discovery;
pub mod error;
pub mod generator;
pub mod geocoding;
pub mod map_links;
pub mod matcher;
pub mod messages;
pub mod models;
pub mod ors;
pub mod session;
pub mod surface;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;

use crate::conversation::ConversationStateMachine;
use crate::discovery::RouteDiscoveryService;
use crate::error::CriteriaError;
use crate::models::{ApiError, InboundEvent, SearchCriteria, SurfaceProduct, validate_criteria};

#[derive(Clone)]
pub struct AppState {
    pub conversation: Arc<ConversationStateMachine>,
    pub discovery: Arc<RouteDiscoveryService>,
}

impl AppState {
    pub fn new(conversation: ConversationStateMachine, discovery: Arc<RouteDiscoveryService>) -> Self {
        Self {
            conversation: Arc::new(conversation),
            discovery,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/search", post(search_handler))
        .route("/api/cities", get(cities_handler))
        .route("/api/surfaces", get(surfaces_handler))
        .with_state(state)
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(event): Json<InboundEvent>,
) -> impl IntoResponse {
    Json(state.conversation.handle(event).await)
}

async fn search_handler(
    State(state): State<AppState>,
    Json(criteria): Json<SearchCriteria>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    validate_criteria(&criteria).map_err(bad_request)?;
    let routes = state.discovery.search(&criteria).await;
    Ok(Json(routes))
}

async fn cities_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.conversation.cities().to_vec())
}

#[derive(Serialize)]
struct SurfaceInfo {
    id: &'static str,
    label: &'static str,
}

async fn surfaces_handler() -> impl IntoResponse {
    let surfaces: Vec<SurfaceInfo> = SurfaceProduct::ALL
        .into_iter()
        .map(|product| SurfaceInfo {
            id: product.id(),
            label: product.label(),
        })
        .collect();
    Json(surfaces)
}

fn bad_request(err: CriteriaError) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}
