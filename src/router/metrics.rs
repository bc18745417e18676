//! Prometheus exposition.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::AppState;

const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Render every recorded metric.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();

    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body)
}
