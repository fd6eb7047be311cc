use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::AppState;

/// GET /healthz
pub async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let users = state.shared.users.ping().await;
    let stock = state.shared.stock.ping().await;

    match (users, stock) {
        (Ok(()), Ok(())) => (StatusCode::OK, "ok"),
        (users, stock) => {
            if let Err(e) = users {
                tracing::warn!(error = %e, "Users database health check failed");
            }
            if let Err(e) = stock {
                tracing::warn!(error = %e, "Stock database health check failed");
            }
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

/// GET /admin/metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    state.prometheus_handle.as_ref().map_or_else(
        || (StatusCode::NOT_FOUND, "Metrics are not enabled").into_response(),
        |handle| {
            (
                [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
                handle.render(),
            )
                .into_response()
        },
    )
}
