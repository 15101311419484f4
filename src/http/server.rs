//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, request ID, optional timeout)
//! - Own the shared outbound client for recursive sub-calls
//! - Serve until the shutdown signal

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::http::fanout::fib_handler;
use crate::http::request::RequestIdLayer;
use crate::observability::propagation;
use crate::observability::{CausalSpan, SpanContext};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared outbound client for recursive sub-calls; no per-request
    /// state.
    pub client: Client<HttpConnector, Body>,
    /// Base URL sub-calls are dispatched to, without a trailing slash.
    pub upstream_base: Arc<String>,
    /// Liveness hint returned by the root endpoint.
    pub hint: Arc<String>,
}

/// HTTP server for the fibonacci service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let upstream_base = config.upstream.base_url.trim_end_matches('/').to_string();
        let hint = format!(
            "Your server is live! Try to navigate to: http://{}/fib?i=6",
            config.listener.bind_address
        );

        let state = AppState {
            client,
            upstream_base: Arc::new(upstream_base),
            hint: Arc::new(hint),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/", get(root_handler))
            .route("/favicon.ico", get(favicon_handler))
            .route("/fib", get(fib_handler))
            .route("/fibinternal", get(fib_handler))
            .with_state(state)
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http());

        // 0 means no deadline anywhere on the recursive call chain.
        if config.timeouts.request_secs > 0 {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )));
        }
        router
    }

    /// Run the server, accepting connections on the given listener, until
    /// the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Liveness endpoint: annotates its span, performs the placeholder
/// storage lookup, and returns a static hint.
async fn root_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let parent = propagation::extract(&headers);
    let mut span = CausalSpan::start("root", parent.as_ref());
    span.add_event("annotation within span", vec![]);

    let _ = db_lookup(&span.context(), "foo");

    span.end();
    state.hint.as_str().to_string()
}

async fn favicon_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Placeholder database lookup: opens and closes a child span without
/// touching any real storage.
fn db_lookup(parent: &SpanContext, _key: &str) -> i64 {
    let mut span = CausalSpan::start("database", Some(parent));
    span.end();
    0
}
