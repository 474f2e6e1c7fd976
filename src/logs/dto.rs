use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Manual entry body. Numbers may arrive as JSON numbers or numeric strings.
#[derive(Debug, Default, Deserialize)]
pub struct CreateLogRequest {
    #[serde(default)]
    pub food_name: Option<String>,
    #[serde(default)]
    pub calories: Option<Value>,
    #[serde(default)]
    pub protein: Option<Value>,
    /// Defaults to today in the user's calendar.
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateFilter {
    /// An empty value means "all days".
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearLogsResponse {
    pub deleted: u64,
    pub message: String,
}
