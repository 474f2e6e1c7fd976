use serde_json::Value;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::chat::transcript::BreakdownItem;
use crate::date_key::{DateKey, LocalCalendar};
use crate::error::AppError;
use crate::logs::dto::CreateLogRequest;
use crate::logs::repo;
use crate::logs::repo_types::{non_negative, LogEntry, NewLog};

/// Whole seconds keep stored timestamps the same width, so they sort as text.
fn created_now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(0).unwrap_or(now)
}

fn parse_amount(field: &str, raw: Option<&Value>) -> Result<f64, AppError> {
    let v = match raw {
        None | Some(Value::Null) => return Err(AppError::validation(format!("{field} is required"))),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(AppError::validation(format!("{field} is required")))
        }
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    let v = v.ok_or_else(|| AppError::validation(format!("{field} must be a number")))?;
    non_negative(field, v)
}

pub fn validate(req: &CreateLogRequest, calendar: &LocalCalendar) -> Result<NewLog, AppError> {
    let food_name = req.food_name.as_deref().unwrap_or_default();
    let calories = parse_amount("calories", req.calories.as_ref())?;
    let protein = parse_amount("protein", req.protein.as_ref())?;
    let date = match req.date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => calendar.normalize(raw)?,
        _ => calendar.today(),
    };
    NewLog::new(food_name, calories, protein, date)
}

#[instrument(skip(db, calendar, req))]
pub async fn create_log(
    db: &SqlitePool,
    calendar: &LocalCalendar,
    req: &CreateLogRequest,
) -> Result<LogEntry, AppError> {
    let new = validate(req, calendar)?;
    let entry = repo::insert(db, &new, created_now()).await?;
    info!(id = entry.id, date = %entry.date, "log created");
    Ok(entry)
}

/// Name under which a breakdown item is logged, e.g. `"2 roti"` or `"1/2 cup rice"`.
pub fn breakdown_food_name(item: &BreakdownItem) -> String {
    match item.quantity_or_measurement.as_deref() {
        Some(q) => format!("{q} {}", item.label),
        None => item.label.clone(),
    }
}

/// Stores one log per breakdown item on `date`, all or nothing.
#[instrument(skip(db, items), fields(items = items.len()))]
pub async fn commit_breakdown(
    db: &SqlitePool,
    date: DateKey,
    items: &[BreakdownItem],
) -> Result<Vec<LogEntry>, AppError> {
    let new_logs = items
        .iter()
        .map(|item| NewLog::new(&breakdown_food_name(item), item.calories, item.protein, date))
        .collect::<Result<Vec<_>, _>>()?;

    let created_at = created_now();
    let mut tx = db.begin().await?;
    let mut created = Vec::with_capacity(new_logs.len());
    for new in &new_logs {
        created.push(repo::insert(&mut *tx, new, created_at).await?);
    }
    tx.commit().await?;
    info!(count = created.len(), %date, "breakdown committed");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use serde_json::json;
    use time::macros::offset;

    fn calendar() -> LocalCalendar {
        LocalCalendar::new(offset!(+5:30))
    }

    fn request(v: Value) -> CreateLogRequest {
        serde_json::from_value(v).expect("request")
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let new = validate(
            &request(json!({"food_name": " Oats ", "calories": "150.5", "protein": 5, "date": "2024-05-01"})),
            &calendar(),
        )
        .expect("valid");
        assert_eq!(new.food_name, "Oats");
        assert_eq!(new.calories, 150.5);
        assert_eq!(new.protein, 5.0);
        assert_eq!(new.date.to_string(), "2024-05-01");
    }

    #[test]
    fn date_defaults_to_today() {
        let cal = calendar();
        let new = validate(
            &request(json!({"food_name": "Oats", "calories": 1, "protein": 1})),
            &cal,
        )
        .unwrap();
        assert_eq!(new.date, cal.today());
    }

    #[test]
    fn rejects_missing_or_invalid_fields() {
        let cases = [
            json!({"calories": 1, "protein": 1}),
            json!({"food_name": "  ", "calories": 1, "protein": 1}),
            json!({"food_name": "Oats", "protein": 1}),
            json!({"food_name": "Oats", "calories": "", "protein": 1}),
            json!({"food_name": "Oats", "calories": "lots", "protein": 1}),
            json!({"food_name": "Oats", "calories": -1, "protein": 1}),
            json!({"food_name": "Oats", "calories": 1, "protein": [1]}),
        ];
        for case in cases {
            let err = validate(&request(case.clone()), &calendar()).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{case} -> {err:?}");
        }
    }

    #[test]
    fn rejects_bad_dates() {
        let err = validate(
            &request(json!({"food_name": "Oats", "calories": 1, "protein": 1, "date": "2024-02-31"})),
            &calendar(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidDate(_)));
    }

    #[test]
    fn breakdown_names_include_quantity() {
        let mut item = BreakdownItem {
            label: "roti".into(),
            quantity_or_measurement: Some("2".into()),
            calories: 160.0,
            protein: 6.0,
        };
        assert_eq!(breakdown_food_name(&item), "2 roti");
        item.quantity_or_measurement = None;
        assert_eq!(breakdown_food_name(&item), "roti");
    }

    #[tokio::test]
    async fn commit_breakdown_is_all_or_nothing() {
        let pool = db::connect("sqlite::memory:").await.expect("pool");
        let date: DateKey = "2024-05-01".parse().unwrap();
        let good = BreakdownItem {
            label: "roti".into(),
            quantity_or_measurement: Some("2".into()),
            calories: 160.0,
            protein: 6.0,
        };
        let bad = BreakdownItem {
            label: "mystery".into(),
            quantity_or_measurement: None,
            calories: -3.0,
            protein: 0.0,
        };

        let err = commit_breakdown(&pool, date, &[good.clone(), bad]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(repo::list(&pool, None).await.unwrap().is_empty());

        let created = commit_breakdown(&pool, date, &[good]).await.expect("commit");
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].food_name, "2 roti");
        assert_eq!(created[0].date, date);
    }

    #[tokio::test]
    async fn create_log_persists() {
        let pool = db::connect("sqlite::memory:").await.expect("pool");
        let entry = create_log(
            &pool,
            &calendar(),
            &request(json!({"food_name": "Egg", "calories": 70, "protein": 6, "date": "2024-05-01"})),
        )
        .await
        .expect("created");
        let all = repo::list(&pool, None).await.unwrap();
        assert_eq!(all, vec![entry]);
    }
}
