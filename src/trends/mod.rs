pub mod handlers;
pub mod series;

use crate::state::AppState;
use axum::Router;

pub use series::{build_series, weekly_totals, TrendSeries};

pub fn router() -> Router<AppState> {
    handlers::routes()
}
