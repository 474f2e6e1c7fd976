//! Per-day rollups of the flat log collection.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::date_key::DateKey;
use crate::logs::repo_types::LogEntry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub date: DateKey,
    /// Oldest first within the day.
    pub entries: Vec<LogEntry>,
    pub total_calories: f64,
    pub total_protein: f64,
}

impl DailyAggregate {
    fn from_entries(date: DateKey, mut entries: Vec<LogEntry>) -> Self {
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        let total_calories = entries.iter().map(|e| e.calories).sum();
        let total_protein = entries.iter().map(|e| e.protein).sum();
        Self {
            date,
            entries,
            total_calories,
            total_protein,
        }
    }
}

/// Groups logs by day, most recent day first. With `filter`, only that day
/// participates. No matching logs yields an empty vec.
pub fn aggregate(logs: &[LogEntry], filter: Option<DateKey>) -> Vec<DailyAggregate> {
    let mut by_day: BTreeMap<DateKey, Vec<LogEntry>> = BTreeMap::new();
    for log in logs.iter().filter(|l| filter.map_or(true, |d| l.date == d)) {
        by_day.entry(log.date).or_default().push(log.clone());
    }
    by_day
        .into_iter()
        .rev()
        .map(|(date, entries)| DailyAggregate::from_entries(date, entries))
        .collect()
}
