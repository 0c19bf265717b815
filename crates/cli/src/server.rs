//! HTTP surface over the search service.

use anyhow::{anyhow, Context};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use retrieval_core::{SearchError, SearchService, SectionResult};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
    pub default_threshold: f64,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/search", get(api_search))
        .with_state(state)
}

pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address {}", bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("listening on http://{}", addr);
    axum::serve(listener, router(state))
        .await
        .context("server shutdown")?;
    Ok(())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn api_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SectionResult>>, ApiError> {
    let threshold = params.threshold.unwrap_or(state.default_threshold);
    let service = state.service.clone();
    let query = params.q;
    let outcome = tokio::task::spawn_blocking(move || service.search(&query, threshold))
        .await
        .map_err(|e| internal_error(anyhow!("search task join error: {}", e)))?;
    match outcome {
        Ok(sections) => Ok(Json(sections)),
        Err(err @ SearchError::InvalidThreshold(_)) => Err(bad_request(err.to_string())),
        Err(err) => {
            error!(error = %err, "search failed");
            Err(internal_error(err.into()))
        }
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
}

fn internal_error(err: anyhow::Error) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            message: err.to_string(),
        }),
    )
}
