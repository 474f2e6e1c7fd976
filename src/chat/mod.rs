pub mod classify;
pub mod dto;
pub mod handlers;
pub mod services;
pub mod transcript;

use crate::state::AppState;
use axum::Router;

pub use services::ChatSessions;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
