use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    chat::{
        dto::SubmitMessageRequest,
        services::{self, Exchange, SessionView, SubmitError},
        transcript::SubmitRejected,
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chat/sessions", post(create_session))
        .route("/chat/sessions/:id", get(get_session).delete(end_session))
        .route("/chat/sessions/:id/messages", post(submit_message))
}

#[instrument(skip(state))]
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionView>) {
    (StatusCode::CREATED, Json(state.sessions.create()))
}

#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    state
        .sessions
        .view(id)
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Chat session not found".into()))
}

#[instrument(skip(state))]
pub async fn end_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> StatusCode {
    if state.sessions.remove(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// POST /chat/sessions/:id/messages { message }
#[instrument(skip(state, body))]
pub async fn submit_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitMessageRequest>,
) -> Result<Json<Exchange>, (StatusCode, String)> {
    match services::submit(&state, id, &body.message).await {
        Ok(exchange) => Ok(Json(exchange)),
        Err(e) => {
            warn!(error = %e, session_id = %id, "submission rejected");
            let status = match e {
                SubmitError::UnknownSession => StatusCode::NOT_FOUND,
                SubmitError::Rejected(SubmitRejected::Busy) => StatusCode::CONFLICT,
                SubmitError::Rejected(SubmitRejected::EmptyUtterance) => StatusCode::BAD_REQUEST,
            };
            Err((status, e.to_string()))
        }
    }
}
