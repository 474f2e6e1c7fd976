use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, warn};

use crate::{
    settings::{repo, services},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct MaintenanceCaloriesResponse {
    pub maintenance_calories: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMaintenanceCalories {
    #[serde(default)]
    pub maintenance_calories: Value,
}

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/settings/maintenance-calories",
        get(get_maintenance_calories).post(update_maintenance_calories),
    )
}

#[instrument(skip(state))]
pub async fn get_maintenance_calories(
    State(state): State<AppState>,
) -> Result<Json<MaintenanceCaloriesResponse>, (StatusCode, String)> {
    let maintenance_calories = repo::get_maintenance_target(&state.db).await?;
    Ok(Json(MaintenanceCaloriesResponse {
        maintenance_calories,
    }))
}

#[instrument(skip(state, body))]
pub async fn update_maintenance_calories(
    State(state): State<AppState>,
    Json(body): Json<UpdateMaintenanceCalories>,
) -> Result<Json<MaintenanceCaloriesResponse>, (StatusCode, String)> {
    match services::set_maintenance_target(&state.db, &body.maintenance_calories).await {
        Ok(maintenance_calories) => Ok(Json(MaintenanceCaloriesResponse {
            maintenance_calories,
        })),
        Err(e) => {
            warn!(error = %e, "maintenance target rejected");
            Err(e.into())
        }
    }
}
