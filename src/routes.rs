//! API route handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::error::ScrapeError;
use crate::scraper::ScrapeOrchestrator;
use crate::types::{ErrorResponse, HealthResponse, PlayerResponse, RosterResponse};

/// Application state shared across handlers.
pub struct AppState {
    pub orchestrator: Arc<ScrapeOrchestrator>,
}

/// Error type for API handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ScrapeError> for ApiError {
    fn from(e: ScrapeError) -> Self {
        tracing::error!("Unhandled error during scraping process: {}", e);
        Self::internal("Failed to complete scraping process. Please try again later.")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Full roster endpoint.
pub async fn roster(State(state): State<Arc<AppState>>) -> Result<Json<RosterResponse>, ApiError> {
    let fetched = state.orchestrator.fetch_roster().await?;
    Ok(Json(RosterResponse::from(&fetched)))
}

/// Player detail endpoint. Scrape failures still answer 200 with a
/// placeholder record.
pub async fn player(
    State(state): State<Arc<AppState>>,
    Path(player_id): Path<String>,
) -> Result<Json<PlayerResponse>, ApiError> {
    let player_id = player_id.trim();
    if player_id.is_empty() {
        return Err(ApiError::bad_request("Player ID is required"));
    }

    tracing::info!("Processing API request for player ID: {}", player_id);
    let fetched = state.orchestrator.fetch_detail(player_id).await;
    Ok(Json(PlayerResponse::from(&fetched)))
}
