//! platform-age tells how long a streaming platform account has existed.
#![forbid(unsafe_code)]

pub mod account;
pub mod clock;
pub mod config;
pub mod directory;
pub mod error;
mod router;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::error_handling::HandleErrorLayer;
use axum::http::{Method, header};
use axum::middleware as AxumMiddleware;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

use account::{AccountAgeService, AccountRepository, NameValidator};
use config::DirectoryKind;
use directory::{DirectoryClient, FakeDirectory, TwitchClient};
pub use error::ServerError;

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub validator: NameValidator,
    pub accounts: Arc<AccountAgeService>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire the account service over a directory and a clock.
    pub fn new(
        config: Arc<config::Configuration>,
        directory: Arc<dyn DirectoryClient>,
        clock: Arc<dyn clock::Clock>,
    ) -> Self {
        Self {
            config,
            validator: NameValidator::default(),
            accounts: Arc::new(AccountAgeService::new(
                AccountRepository::new(directory),
                clock,
            )),
            metrics: None,
        }
    }
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.timeout_secs);
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout, answered like any other server error.
        .layer(HandleErrorLayer::new(error::handle_middleware_error))
        .layer(TimeoutLayer::new(timeout))
        // Remove senstive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers(Any),
        );

    let mut routes = Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `GET /users/platform-age` goes to `platform_age`.
        .nest("/users", router::users::router());

    if state.metrics.is_some() {
        // `GET /metrics` goes to `metrics`.
        routes = routes.route("/metrics", get(router::metrics::metrics));
    }

    routes
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state(
    config: Arc<config::Configuration>,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    let directory: Arc<dyn DirectoryClient> = match config.directory.kind {
        DirectoryKind::Twitch => {
            Arc::new(TwitchClient::connect(&config.directory).await?)
        },
        DirectoryKind::Fake => {
            tracing::warn!("serving accounts from the in-memory directory");
            Arc::new(FakeDirectory::default())
        },
    };

    let metrics = if config.telemetry.metrics {
        Some(telemetry::setup_metrics_recorder()?)
    } else {
        None
    };

    Ok(AppState {
        metrics,
        ..AppState::new(config, directory, Arc::new(clock::SystemClock::new()))
    })
}
