use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, instrument, warn};
use utoipa::{OpenApi, ToSchema};

use crate::db::{ObservationQuery, StoredObservation, WeatherStats};
use crate::export::{flat_csv, marine_csv, ExportFormat, ExportQuery};
use crate::services::{ObservationService, SavePolicy};
use crate::stations::StationConfig;

#[derive(Clone)]
pub struct AppState {
    pub observation_service: ObservationService,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScrapeResponse {
    pub success: bool,
    pub message: String,
    /// Distinct records written this cycle. An observation attached to
    /// several reference instants counts once, so this can be lower than
    /// the number of aligned rows. Absent when nothing was scraped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_saved: Option<usize>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(rejection: QueryRejection) -> ApiError {
    warn!("Rejected query string: {}", rejection.body_text());
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: rejection.body_text(),
        }),
    )
}

fn internal_error(e: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        get_latest,
        get_weather_data,
        export_weather_data,
        get_stats,
        get_stations,
        trigger_scrape
    ),
    components(schemas(
        StoredObservation,
        WeatherStats,
        StationConfig,
        HealthResponse,
        ErrorResponse,
        ScrapeResponse,
        ExportFormat
    )),
    tags((name = "weather", description = "Ise Bay marine weather observations"))
)]
pub struct ApiDoc;

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/weather/latest", get(get_latest))
        .route("/weather/data", get(get_weather_data))
        .route("/weather/export", get(export_weather_data))
        .route("/weather/stats", get(get_stats))
        .route("/weather/scrape", post(trigger_scrape))
        .route("/stations", get(get_stations))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .nest("/api", api_routes)
        .fallback(not_found)
        .layer(cors)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".to_string(),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "weather",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
#[instrument]
async fn health() -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}

#[utoipa::path(
    get,
    path = "/api/weather/latest",
    tag = "weather",
    responses(
        (status = 200, description = "Most recent observation of each station", body = [StoredObservation]),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn get_latest(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredObservation>>, ApiError> {
    debug!("Fetching latest observation per station");
    let observations = state.observation_service.get_latest().await.map_err(|e| {
        error!("Failed to fetch latest observations: {}", e);
        internal_error(e)
    })?;

    info!("Retrieved latest observations for {} stations", observations.len());
    Ok(Json(observations))
}

#[utoipa::path(
    get,
    path = "/api/weather/data",
    tag = "weather",
    params(ObservationQuery),
    responses(
        (status = 200, description = "Observations matching the filter, newest first", body = [StoredObservation]),
        (status = 400, description = "Malformed query string", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn get_weather_data(
    State(state): State<AppState>,
    params: Result<Query<ObservationQuery>, QueryRejection>,
) -> Result<Json<Vec<StoredObservation>>, ApiError> {
    let Query(params) = params.map_err(bad_request)?;
    let observations = state
        .observation_service
        .get_observations(&params)
        .await
        .map_err(|e| {
            error!("Failed to query observations: {}", e);
            internal_error(e)
        })?;

    info!("Query returned {} observations", observations.len());
    Ok(Json(observations))
}

#[utoipa::path(
    get,
    path = "/api/weather/export",
    tag = "weather",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV download with a UTF-8 BOM", content_type = "text/csv", body = String),
        (status = 400, description = "Malformed query string", body = ErrorResponse),
        (status = 500, description = "Storage or CSV failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn export_weather_data(
    State(state): State<AppState>,
    params: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params.map_err(bad_request)?;

    let observations = state
        .observation_service
        .get_observations(&params.observation_query())
        .await
        .map_err(|e| {
            error!("Failed to query observations for export: {}", e);
            internal_error(e)
        })?;

    let body = match params.format {
        ExportFormat::Flat => flat_csv(&observations),
        ExportFormat::Marine => marine_csv(&observations, state.observation_service.stations()),
    }
    .map_err(|e| {
        error!("Failed to write CSV export: {}", e);
        internal_error(e)
    })?;

    info!(
        "Exported {} observations as {:?} CSV ({} bytes)",
        observations.len(),
        params.format,
        body.len()
    );

    let filename = format!(
        "{}_{}.csv",
        params.format.file_stem(),
        Local::now().format("%Y%m%d_%H%M")
    );
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];

    Ok((headers, body))
}

#[utoipa::path(
    get,
    path = "/api/weather/stats",
    tag = "weather",
    responses(
        (status = 200, description = "Stored record count", body = WeatherStats),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn get_stats(State(state): State<AppState>) -> Result<Json<WeatherStats>, ApiError> {
    let stats = state.observation_service.get_stats().await.map_err(|e| {
        error!("Failed to count observations: {}", e);
        internal_error(e)
    })?;

    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/stations",
    tag = "weather",
    responses((status = 200, description = "Configured stations", body = [StationConfig]))
)]
#[instrument(skip(state))]
async fn get_stations(State(state): State<AppState>) -> Json<Vec<StationConfig>> {
    Json(state.observation_service.stations().to_vec())
}

#[utoipa::path(
    post,
    path = "/api/weather/scrape",
    tag = "weather",
    responses(
        (status = 200, description = "Scrape cycle finished", body = ScrapeResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
async fn trigger_scrape(State(state): State<AppState>) -> Result<Json<ScrapeResponse>, ApiError> {
    info!("Starting weather data scraping");
    let summary = state
        .observation_service
        .scrape_and_store(SavePolicy::All)
        .await
        .map_err(|e| {
            error!("Scrape cycle failed: {}", e);
            internal_error(e)
        })?;

    if summary.aligned_rows == 0 {
        warn!("Scrape cycle produced no rows");
        return Ok(Json(ScrapeResponse {
            success: false,
            message: "No data was scraped".to_string(),
            records_saved: None,
        }));
    }

    let records_saved = summary.records_saved();
    info!("Scrape cycle saved {} records", records_saved);
    Ok(Json(ScrapeResponse {
        success: true,
        message: format!("Successfully scraped and saved {} records", records_saved),
        records_saved: Some(records_saved),
    }))
}
