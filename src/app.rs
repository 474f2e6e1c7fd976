use std::{net::SocketAddr, time::Duration};

use axum::{
    body::Body,
    http::{Request, Response},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{field, info_span, Span};
use uuid::Uuid;

use crate::state::AppState;
use crate::{chat, logs, settings, trends};

/// Every endpoint, relative to `/api/v1`.
fn api() -> Router<AppState> {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(logs::router())
        .merge(trends::router())
        .merge(settings::router())
        .merge(chat::router())
}

fn request_span(req: &Request<Body>) -> Span {
    info_span!(
        "http_request",
        request_id = %Uuid::new_v4(),
        method = %req.method(),
        path = req.uri().path(),
        status = field::Empty,
        latency_ms = field::Empty,
    )
}

fn record_response(res: &Response<Body>, latency: Duration, span: &Span) {
    let status = res.status();
    span.record("status", status.as_u16());
    span.record("latency_ms", latency.as_millis() as u64);
    if status.is_server_error() {
        tracing::error!(%status, "request failed");
    } else if status.is_client_error() {
        tracing::warn!(%status, "request rejected");
    } else {
        tracing::debug!(%status, "request served");
    }
}

pub fn build_app(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http()
        .make_span_with(request_span)
        .on_response(record_response);

    Router::new()
        .nest("/api/v1", api())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(trace)
}

/// Serves until ctrl-c, letting in-flight requests finish.
pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
