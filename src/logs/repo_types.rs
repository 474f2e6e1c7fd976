use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::date_key::DateKey;
use crate::error::AppError;

#[derive(Debug, FromRow)]
pub struct LogRow {
    pub id: i64,
    pub food_name: String,
    pub calories: f64,
    pub protein: f64,
    pub date: String,
    pub created_at: OffsetDateTime,
}

/// One committed meal record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub food_name: String,
    pub calories: f64,
    pub protein: f64,
    pub date: DateKey,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl TryFrom<LogRow> for LogEntry {
    type Error = AppError;

    fn try_from(r: LogRow) -> Result<Self, Self::Error> {
        let date = r.date.parse::<DateKey>().map_err(|_| {
            AppError::CorruptRecord(format!("log {} has stored date '{}'", r.id, r.date))
        })?;
        Ok(Self {
            id: r.id,
            food_name: r.food_name,
            calories: r.calories,
            protein: r.protein,
            date,
            created_at: r.created_at,
        })
    }
}

/// A validated log waiting to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLog {
    pub food_name: String,
    pub calories: f64,
    pub protein: f64,
    pub date: DateKey,
}

impl NewLog {
    pub fn new(food_name: &str, calories: f64, protein: f64, date: DateKey) -> Result<Self, AppError> {
        let food_name = food_name.trim();
        if food_name.is_empty() {
            return Err(AppError::validation("food_name is required"));
        }
        Ok(Self {
            food_name: food_name.to_string(),
            calories: non_negative("calories", calories)?,
            protein: non_negative("protein", protein)?,
            date,
        })
    }
}

pub(crate) fn non_negative(field: &str, v: f64) -> Result<f64, AppError> {
    if !v.is_finite() || v < 0.0 {
        return Err(AppError::validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(v)
}
