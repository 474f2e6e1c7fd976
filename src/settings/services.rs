use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::settings::repo;

/// Only positive integers are accepted; `2000.5`, `"2000"` and `-5` are not.
pub fn validate_target(raw: &Value) -> Result<i64, AppError> {
    match raw.as_i64() {
        Some(v) if v > 0 => Ok(v),
        _ => Err(AppError::validation(
            "Valid maintenance_calories integer is required",
        )),
    }
}

#[instrument(skip(db))]
pub async fn set_maintenance_target(db: &SqlitePool, raw: &Value) -> Result<i64, AppError> {
    let calories = validate_target(raw)?;
    repo::store_maintenance_target(db, calories).await?;
    info!(calories, "maintenance target updated");
    Ok(calories)
}
