use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::gazetteer::{normalize, MatchSource, PlaceRecord, Resolution};

use super::state::AppState;

const DEFAULT_CANDIDATE_LIMIT: usize = 10;
const MAX_CANDIDATE_LIMIT: usize = 100;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub struct ApiError(StatusCode, String);

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

fn required_city(city: Option<&str>) -> Result<&str, ApiError> {
    match city {
        Some(c) if !c.trim().is_empty() => Ok(c),
        _ => Err(api_error(StatusCode::BAD_REQUEST, "Missing 'city' parameter")),
    }
}

// ─── GET /api/resolve ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResolveQuery {
    pub city: Option<String>,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub city: String,
    pub lat: f64,
    pub lng: f64,
    pub source: MatchSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geoname_id: Option<String>,
}

pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveQuery>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let start = Instant::now();
    let city = required_city(params.city.as_deref())?;

    let resolution = state.resolver.resolve(city);
    tracing::info!(
        city,
        resolved = resolution.is_resolved(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "GET /api/resolve"
    );

    match resolution {
        Resolution::Resolved { lat, lng, source, geoname_id } => Ok(Json(ResolveResponse {
            city: city.to_string(),
            lat,
            lng,
            source,
            geoname_id,
        })),
        Resolution::Unresolved(reason) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("No match for '{}' ({})", city, reason),
        )),
    }
}

// ─── GET /api/candidates ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct CandidatesQuery {
    pub city: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct CandidateView {
    pub geoname_id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub population: u64,
    pub feature_class: String,
}

impl From<&PlaceRecord> for CandidateView {
    fn from(r: &PlaceRecord) -> Self {
        Self {
            geoname_id: r.geoname_id.clone(),
            name: r.name.clone(),
            lat: r.lat,
            lng: r.lng,
            population: r.population,
            feature_class: r.feature_class.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct CandidatesResponse {
    pub query: String,
    pub key: String,
    pub total: usize,
    pub candidates: Vec<CandidateView>,
}

pub async fn candidates(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CandidatesQuery>,
) -> Result<Json<CandidatesResponse>, ApiError> {
    let city = required_city(params.city.as_deref())?;
    let limit = params.limit.unwrap_or(DEFAULT_CANDIDATE_LIMIT).min(MAX_CANDIDATE_LIMIT);

    let ranked = state.resolver.ranked_candidates(city);
    Ok(Json(CandidatesResponse {
        query: city.to_string(),
        key: normalize(city).to_string(),
        total: ranked.len(),
        candidates: ranked.into_iter().take(limit).map(CandidateView::from).collect(),
    }))
}

// ─── GET /api/stats ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatsResponse {
    pub records: usize,
    pub keys: usize,
    pub overrides: usize,
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let index = state.resolver.index();
    Json(StatsResponse {
        records: index.len(),
        keys: index.key_count(),
        overrides: state.resolver.overrides().len(),
    })
}
