//! HTTP API gateway for CardioLake.
//!
//! Thin routing over the summary service and the agent pipeline:
//!
//! - `GET  /`                               — API banner
//! - `GET  /api/health`                     — health check
//! - `GET  /api/patients`                   — patient list
//! - `GET  /api/patients/{id}`              — one patient (404 when absent)
//! - `GET  /api/patients/{id}/summary`      — flattened summary
//! - `GET  /api/patients/{id}/observations` — numeric measurements
//! - `POST /api/sessions`                   — open a session
//! - `POST /api/sessions/{sid}/report`      — run the specialists, cache the reports
//! - `POST /api/sessions/{sid}/questions`   — ask about the cached reports
//! - `GET  /api/sessions/{sid}/history`     — Q&A history
//! - `DELETE /api/sessions/{sid}/cache`     — drop reports and history
//! - `GET  /api/questions`                  — quick questions
//!
//! Failures come back as `{"detail": "..."}`.

pub mod api;
pub mod sessions;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use cardiolake_agents::AgentInvoker;
use cardiolake_config::AppConfig;
use cardiolake_core::error::{AgentError, StoreError};
use cardiolake_fhir::SummaryService;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use crate::sessions::SessionStore;

/// Name reported by the banner and the health check.
pub const SERVICE_NAME: &str = "HealthLake AI API";

/// Shared application state for the gateway.
pub struct GatewayState {
    pub summary: SummaryService,
    /// `None` when no agent runtime is configured; agent routes then fail.
    pub agents: Option<Arc<AgentInvoker>>,
    pub sessions: SessionStore,
}

impl GatewayState {
    pub fn new(summary: SummaryService, agents: Option<Arc<AgentInvoker>>) -> Self {
        Self {
            summary,
            agents,
            sessions: SessionStore::new(),
        }
    }

    fn agents(&self) -> Result<&Arc<AgentInvoker>, ApiError> {
        self.agents.as_ref().ok_or_else(|| {
            ApiError::Agent(AgentError::NotConfigured(
                "no agent runtime is configured for this gateway".into(),
            ))
        })
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .merge(api::api_router())
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// CORS for the configured origins. Origins that don't parse are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
pub async fn start(config: &AppConfig, state: SharedState) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let app = build_router(state).layer(cors_layer(&config.gateway.allowed_origins));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Errors ---

/// Handler failure, rendered as `{"detail": ...}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Store(StoreError),
    Agent(AgentError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        Self::Agent(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::NotFound(what) => (StatusCode::NOT_FOUND, what),
            Self::BadRequest(why) => (StatusCode::BAD_REQUEST, why),
            Self::Agent(AgentError::NotConfigured(why)) => (StatusCode::SERVICE_UNAVAILABLE, why),
            Self::Store(e) => {
                error!(error = %e, "Datastore request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            Self::Agent(e) => {
                error!(error = %e, "Agent request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
    docs: &'static str,
    health: &'static str,
}

async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: SERVICE_NAME,
        docs: "/docs",
        health: "/api/health",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}
