use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    date_key::DateKey,
    error::AppError,
    logs::{
        aggregate::{aggregate, DailyAggregate},
        dto::{ClearLogsResponse, CreateLogRequest, DateFilter},
        repo,
        repo_types::LogEntry,
        services,
    },
    state::AppState,
};

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/logs", get(list_logs))
        .route("/logs/daily", get(daily_logs))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/logs", post(create_log).delete(clear_logs))
        .route("/logs/:id", delete(delete_log))
}

fn date_filter(state: &AppState, f: &DateFilter) -> Result<Option<DateKey>, AppError> {
    match f.date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => state.calendar.normalize(raw).map(Some),
        _ => Ok(None),
    }
}

#[instrument(skip(state))]
pub async fn list_logs(
    State(state): State<AppState>,
    Query(f): Query<DateFilter>,
) -> ApiResult<Json<Vec<LogEntry>>> {
    let date = date_filter(&state, &f)?;
    let logs = repo::list(&state.db, date).await?;
    Ok(Json(logs))
}

#[instrument(skip(state))]
pub async fn daily_logs(
    State(state): State<AppState>,
    Query(f): Query<DateFilter>,
) -> ApiResult<Json<Vec<DailyAggregate>>> {
    let date = date_filter(&state, &f)?;
    let logs = repo::list(&state.db, None).await?;
    Ok(Json(aggregate(&logs, date)))
}

/// POST /logs { food_name, calories, protein, date? }
#[instrument(skip(state, body))]
pub async fn create_log(
    State(state): State<AppState>,
    Json(body): Json<CreateLogRequest>,
) -> ApiResult<(StatusCode, HeaderMap, Json<LogEntry>)> {
    let entry = match services::create_log(&state.db, &state.calendar, &body).await {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "create_log rejected");
            return Err(e.into());
        }
    };

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/logs/{}", entry.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(entry)))
}

#[instrument(skip(state))]
pub async fn delete_log(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    repo::delete(&state.db, id).await?;
    info!(id, "log deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn clear_logs(State(state): State<AppState>) -> ApiResult<Json<ClearLogsResponse>> {
    let deleted = repo::clear(&state.db).await?;
    info!(deleted, "logs cleared");
    Ok(Json(ClearLogsResponse {
        deleted,
        message: format!("All {deleted} food logs deleted successfully"),
    }))
}
