//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{error, info, warn};

use crate::domain::Country;
use crate::render::Renderer;
use crate::resolve::ResolveError;
use crate::service::CalendarError;

use super::dto::*;
use super::state::AppState;

/// Largest page size for station search.
const MAX_SEARCH_LIMIT: usize = 50;

/// Create the application router.
pub fn create_router<R: Renderer + 'static>(state: AppState<R>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stations/search", get(search_stations::<R>))
        .route("/api/stations/:id", get(station_info::<R>))
        .route("/calendar", get(calendar::<R>))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Search stations by identifier or name prefix.
async fn search_stations<R: Renderer + 'static>(
    State(state): State<AppState<R>>,
    Query(req): Query<StationSearchRequest>,
) -> Result<Json<StationSearchResponse>, AppError> {
    let country = req
        .country
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(Country::parse)
        .transpose()
        .map_err(|_| AppError::BadRequest {
            message: "unknown country".to_string(),
        })?;
    let limit = req.limit.unwrap_or(10).min(MAX_SEARCH_LIMIT);

    let stations = state
        .service
        .search_stations(&req.q, country, limit)
        .await
        .iter()
        .map(StationResult::from_station)
        .collect();

    Ok(Json(StationSearchResponse { stations }))
}

/// Look up one station by identifier.
async fn station_info<R: Renderer + 'static>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Result<Json<StationResult>, AppError> {
    match state.service.station_info(&id).await {
        Some(station) => Ok(Json(StationResult::from_station(&station))),
        None => Err(AppError::NotFound {
            message: "station not found".to_string(),
        }),
    }
}

/// Generate (or fetch from cache) a monthly calendar PDF.
async fn calendar<R: Renderer + 'static>(
    State(state): State<AppState<R>>,
    Query(req): Query<CalendarRequest>,
) -> Result<Response, AppError> {
    let calendar = state
        .service
        .generate(&req.station, req.year, req.month)
        .await?;

    info!(
        station = %calendar.station.id,
        year = req.year,
        month = req.month,
        cached = calendar.from_cache,
        "serving calendar"
    );

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", calendar.download_name),
        ),
    ];
    Ok((headers, calendar.artifact.bytes.clone()).into_response())
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Ambiguous { message: String, candidates: Vec<StationResult> },
    Unavailable { message: String },
    BadGateway { message: String },
    Internal { message: String },
}

impl From<CalendarError> for AppError {
    fn from(e: CalendarError) -> Self {
        let kind = e.kind();
        match e {
            CalendarError::InvalidPeriod(_) | CalendarError::InvalidIdentifierFormat { .. } => {
                warn!(kind, error = %e, "rejected calendar request");
                AppError::BadRequest {
                    message: match kind {
                        "invalid_period" => "invalid year or month".to_string(),
                        _ => "invalid station identifier".to_string(),
                    },
                }
            }
            CalendarError::Unresolvable(ResolveError::Ambiguous { candidates, .. }) => {
                AppError::Ambiguous {
                    message: "several stations match, pick one".to_string(),
                    candidates: candidates.iter().map(StationResult::from_station).collect(),
                }
            }
            CalendarError::Unresolvable(_) => AppError::NotFound {
                message: "no station matches the query".to_string(),
            },
            CalendarError::DirectoryEmpty => {
                error!("calendar requested with an empty station directory");
                AppError::Unavailable {
                    message: "station directory unavailable".to_string(),
                }
            }
            CalendarError::UpstreamTransient { .. } => {
                warn!(error = %e, "tide provider unavailable");
                AppError::Unavailable {
                    message: "tide data provider unavailable, try again later".to_string(),
                }
            }
            CalendarError::UpstreamTerminal(_) | CalendarError::ParseFailure(_) => {
                error!(kind, error = %e, "tide provider request failed");
                AppError::BadGateway {
                    message: "tide data provider could not supply predictions".to_string(),
                }
            }
            CalendarError::RenderFailure(_) | CalendarError::CacheIo(_) => {
                error!(kind, error = %e, "calendar generation failed");
                AppError::Internal {
                    message: "calendar generation failed".to_string(),
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, candidates) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message, Vec::new()),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message, Vec::new()),
            AppError::Ambiguous {
                message,
                candidates,
            } => (StatusCode::CONFLICT, message, candidates),
            AppError::Unavailable { message } => {
                (StatusCode::SERVICE_UNAVAILABLE, message, Vec::new())
            }
            AppError::BadGateway { message } => (StatusCode::BAD_GATEWAY, message, Vec::new()),
            AppError::Internal { message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message, Vec::new())
            }
        };

        (status, Json(ErrorResponse { error, candidates })).into_response()
    }
}
