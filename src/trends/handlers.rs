use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::instrument;

use crate::{
    logs::repo as logs_repo,
    settings::repo as settings_repo,
    state::AppState,
    trends::series::{build_series, weekly_totals, DayTotals, TrendSeries},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/trends", get(get_trend))
        .route("/stats/weekly", get(get_weekly_stats))
}

#[instrument(skip(state))]
pub async fn get_trend(State(state): State<AppState>) -> Result<Json<TrendSeries>, (StatusCode, String)> {
    let target = settings_repo::get_maintenance_target(&state.db).await?;
    let logs = logs_repo::list(&state.db, None).await?;
    Ok(Json(build_series(&logs, target)))
}

#[instrument(skip(state))]
pub async fn get_weekly_stats(
    State(state): State<AppState>,
) -> Result<Json<Vec<DayTotals>>, (StatusCode, String)> {
    let logs = logs_repo::list(&state.db, None).await?;
    Ok(Json(weekly_totals(&logs, state.calendar.today())))
}
