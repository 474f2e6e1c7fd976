use serde::Serialize;

use crate::date_key::DateKey;
use crate::logs::{aggregate, LogEntry};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: DateKey,
    pub calories: f64,
}

/// Chart-ready daily calories, oldest day first, against a constant reference line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub points: Vec<TrendPoint>,
    pub reference: i64,
    pub total_calories: f64,
    /// Zero when there are no points.
    pub average_calories: f64,
}

pub fn build_series(logs: &[LogEntry], maintenance_target: i64) -> TrendSeries {
    let mut days = aggregate(logs, None);
    days.sort_by_key(|d| d.date);

    let points: Vec<TrendPoint> = days
        .into_iter()
        .map(|d| TrendPoint {
            date: d.date,
            calories: d.total_calories,
        })
        .collect();
    let total_calories: f64 = points.iter().map(|p| p.calories).sum();
    let average_calories = if points.is_empty() {
        0.0
    } else {
        total_calories / points.len() as f64
    };

    TrendSeries {
        points,
        reference: maintenance_target,
        total_calories,
        average_calories,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayTotals {
    pub date: DateKey,
    pub calories: f64,
    pub protein: f64,
}

/// The seven days ending on `today`, oldest first, zero-filled.
pub fn weekly_totals(logs: &[LogEntry], today: DateKey) -> Vec<DayTotals> {
    let days = aggregate(logs, None);
    (0..7)
        .rev()
        .filter_map(|back| today.days_before(back))
        .map(|date| match days.iter().find(|d| d.date == date) {
            Some(d) => DayTotals {
                date,
                calories: d.total_calories,
                protein: d.total_protein,
            },
            None => DayTotals {
                date,
                calories: 0.0,
                protein: 0.0,
            },
        })
        .collect()
}
