use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::error::AppError;

pub const DEFAULT_MAINTENANCE_CALORIES: i64 = 2000;

pub async fn get_maintenance_target(db: &SqlitePool) -> Result<i64, AppError> {
    let value = sqlx::query_scalar::<_, i64>("SELECT maintenance_calories FROM settings WHERE id = 1")
        .fetch_optional(db)
        .await?;
    Ok(value.unwrap_or(DEFAULT_MAINTENANCE_CALORIES))
}

/// Callers validate first; see `services::set_maintenance_target`.
pub async fn store_maintenance_target(db: &SqlitePool, calories: i64) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO settings (id, maintenance_calories, updated_at)
        VALUES (1, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            maintenance_calories = excluded.maintenance_calories,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(calories)
    .bind(OffsetDateTime::now_utc())
    .execute(db)
    .await?;
    Ok(())
}
