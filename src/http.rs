//! HTTP surface.
//!
//! Translates the tracker's domain results and errors into the wire
//! contract: JSON bodies, 400s with an `Err` payload for validation and
//! decode failures, bare 400s for storage failures.

use crate::error::TrackerError;
use crate::images::{self, CoverUpload};
use crate::tracker::Tracker;
use crate::types::Series;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::{info, warn};

/// Maximum accepted upload body, 10 MB.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Tracker>,
    pub static_dir: PathBuf,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let static_dir = state.static_dir.clone();

    Router::new()
        .route("/series", get(get_series).post(post_series))
        .route("/series/bulk", post(post_series_bulk))
        .route(
            "/image",
            post(post_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        warn!(error = %self, "request failed");
        match self {
            TrackerError::Validation { .. } | TrackerError::Decode(_) => {
                let body = Json(json!({ "Err": self.to_string() }));
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            _ => StatusCode::BAD_REQUEST.into_response(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    /// Presence flag: base64-encode the whole JSON body.
    b64: Option<String>,
}

async fn get_series(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, TrackerError> {
    let scan = state.tracker.list_all();
    let body = serde_json::to_vec(&scan.series)?;

    if params.b64.is_some() {
        return Ok(STANDARD.encode(body).into_response());
    }

    Ok(Json(scan.series).into_response())
}

async fn post_series(
    State(state): State<AppState>,
    Json(series): Json<Series>,
) -> Result<Response, TrackerError> {
    let all = state.tracker.upsert(series)?;
    info!(count = all.len(), "series upserted");
    Ok(Json(all).into_response())
}

async fn post_series_bulk(
    State(state): State<AppState>,
    Json(incoming): Json<Vec<Series>>,
) -> Result<StatusCode, TrackerError> {
    let count = incoming.len();
    state.tracker.replace_all(incoming)?;
    info!(count, "collection replaced");
    Ok(StatusCode::OK)
}

async fn post_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, TrackerError> {
    let mut id = String::new();
    let mut payload = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| TrackerError::Decode(format!("multipart error: {e}")))?
    {
        let name = field.name().map(|n| n.to_string());
        let text = field
            .text()
            .await
            .map_err(|e| TrackerError::Decode(format!("multipart read error: {e}")))?;
        match name.as_deref() {
            Some("id") => id = text,
            Some("file") => payload = text,
            _ => {}
        }
    }

    match images::store_cover(&state.static_dir, &id, &payload)? {
        CoverUpload::Stored(path) => Ok(Json(json!({ "test": path })).into_response()),
        CoverUpload::Unrecognized => Ok(Json(json!({})).into_response()),
    }
}
