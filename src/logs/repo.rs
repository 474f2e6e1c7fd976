use sqlx::{Executor, Sqlite, SqlitePool};
use time::OffsetDateTime;

use crate::date_key::DateKey;
use crate::error::AppError;
use crate::logs::repo_types::{LogEntry, LogRow, NewLog};

pub async fn insert<'e, E>(db: E, new: &NewLog, created_at: OffsetDateTime) -> Result<LogEntry, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, LogRow>(
        r#"
        INSERT INTO food_logs (food_name, calories, protein, date, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, food_name, calories, protein, date, created_at
        "#,
    )
    .bind(&new.food_name)
    .bind(new.calories)
    .bind(new.protein)
    .bind(new.date.to_string())
    .bind(created_at)
    .fetch_one(db)
    .await?;
    row.try_into()
}

/// Newest first.
pub async fn list(db: &SqlitePool, date: Option<DateKey>) -> Result<Vec<LogEntry>, AppError> {
    let rows = match date {
        Some(date) => {
            sqlx::query_as::<_, LogRow>(
                r#"
                SELECT id, food_name, calories, protein, date, created_at
                FROM food_logs
                WHERE date = ?
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .bind(date.to_string())
            .fetch_all(db)
            .await?
        }
        None => {
            sqlx::query_as::<_, LogRow>(
                r#"
                SELECT id, food_name, calories, protein, date, created_at
                FROM food_logs
                ORDER BY created_at DESC, id DESC
                "#,
            )
            .fetch_all(db)
            .await?
        }
    };
    rows.into_iter().map(LogEntry::try_from).collect()
}

pub async fn delete(db: &SqlitePool, id: i64) -> Result<(), AppError> {
    let res = sqlx::query("DELETE FROM food_logs WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("Log not found".into()));
    }
    Ok(())
}

pub async fn clear(db: &SqlitePool) -> Result<u64, AppError> {
    let res = sqlx::query("DELETE FROM food_logs").execute(db).await?;
    Ok(res.rows_affected())
}
