//! HTTP routes for the proxy functions.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value as JsonValue, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::ApiError;
use crate::extract::OptionalBearer;
use crate::state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/functions/v1/{name}", post(invoke).options(preflight))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}

/// Plain `OPTIONS` requests get an empty success; CORS preflights are
/// answered by the CORS layer before reaching here.
async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn invoke(
    State(state): State<AppState>,
    Path(name): Path<String>,
    OptionalBearer(bearer): OptionalBearer,
    body: Bytes,
) -> Result<Json<JsonValue>, ApiError> {
    let result = state
        .dispatcher
        .dispatch(&name, bearer.as_deref(), &body)
        .await?;
    Ok(Json(result))
}
