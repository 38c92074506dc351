use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::extract::{AnalysisReport, ExtractError};
use crate::location::LocationRecord;
use crate::output::{render_map_html, to_feature_collection};

use super::state::AppState;

const TARGET_SERVER: &str = "server";

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        let status = match e {
            ExtractError::EmptyInput | ExtractError::UnknownPromptKind(_) => StatusCode::BAD_REQUEST,
            ExtractError::Llm(_) => StatusCode::BAD_GATEWAY,
            ExtractError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        api_error(status, e.to_string())
    }
}

// ─── GET /api/locations ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct LocationsQuery {
    /// Delimited location list, e.g. `[Paris, France; Tokyo, Japan]`.
    pub raw: Option<String>,
}

async fn resolve_records(state: &AppState, params: LocationsQuery) -> Result<Vec<LocationRecord>, ApiError> {
    let raw = params
        .raw
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing 'raw' parameter"))?;
    Ok(state.pipeline.resolve_raw(&raw).await.records())
}

pub async fn locations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LocationsQuery>,
) -> Result<Json<Vec<LocationRecord>>, ApiError> {
    let start = Instant::now();
    let records = resolve_records(&state, params).await?;

    info!(
        target: TARGET_SERVER,
        records = records.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "GET /api/locations"
    );
    Ok(Json(records))
}

// ─── GET /api/map ────────────────────────────────────────────────

pub async fn map_geojson(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LocationsQuery>,
) -> Result<Json<geojson::FeatureCollection>, ApiError> {
    let records = resolve_records(&state, params).await?;
    Ok(Json(to_feature_collection(&records)))
}

// ─── GET /map ────────────────────────────────────────────────────

pub async fn map_page(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LocationsQuery>,
) -> Result<Html<String>, ApiError> {
    let records = resolve_records(&state, params).await?;
    render_map_html(&records)
        .map(Html)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

// ─── POST /api/analyze ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct TextBody {
    pub text: String,
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TextBody>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let start = Instant::now();
    let explorer = state.explorer.as_ref().ok_or_else(|| {
        api_error(StatusCode::SERVICE_UNAVAILABLE, "LLM backend not configured (missing API key)")
    })?;

    let report = explorer.process_text(&body.text).await?;

    info!(
        target: TARGET_SERVER,
        locations = report.locations.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "POST /api/analyze"
    );
    Ok(Json(report))
}

// ─── POST /api/extract/{kind} ────────────────────────────────────

#[derive(Serialize)]
pub struct ExtractResponse {
    pub kind: String,
    pub result: String,
}

pub async fn extract(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(body): Json<TextBody>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let explorer = state.explorer.as_ref().ok_or_else(|| {
        api_error(StatusCode::SERVICE_UNAVAILABLE, "LLM backend not configured (missing API key)")
    })?;

    let result = explorer.extract_named(&kind, &body.text).await?;
    Ok(Json(ExtractResponse { kind, result }))
}
