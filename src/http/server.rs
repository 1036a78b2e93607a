//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Buffer each request and hand it to the dispatcher
//! - Spawn the health scheduler alongside the listener
//! - Graceful shutdown with a bounded grace period

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use http_body_util::LengthLimitError;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::dispatch::{Dispatcher, RequestCounters};
use crate::health::{HealthScheduler, TcpProbe};
use crate::http::forward::HyperForwarder;
use crate::http::request::ProxyRequest;
use crate::http::response::{payload_too_large, ServedBy};
use crate::lifecycle::ShutdownSignal;
use crate::load_balancer::{BackendPool, PoolError};
use crate::observability::{metrics, EventSink, TracingSink};
use crate::resilience::backoff::calculate_backoff;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub max_body_bytes: usize,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    pool: Arc<BackendPool>,
    sink: Arc<dyn EventSink>,
}

impl HttpServer {
    /// Create a new HTTP server that reports engine events through tracing.
    pub fn new(config: ProxyConfig) -> Result<Self, PoolError> {
        Self::with_sink(config, TracingSink::shared())
    }

    /// Create a new HTTP server with an explicit event sink.
    pub fn with_sink(config: ProxyConfig, sink: Arc<dyn EventSink>) -> Result<Self, PoolError> {
        let pool = Arc::new(BackendPool::from_addresses(&config.backends, config.strategy)?);

        let forwarder = Arc::new(HyperForwarder::new(
            Duration::from_secs(config.timeouts.connect_secs),
            Duration::from_secs(config.timeouts.request_secs),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            pool.clone(),
            forwarder,
            &config.retries,
            sink.clone(),
        ));

        let state = AppState {
            dispatcher,
            max_body_bytes: config.listener.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            pool,
            sink,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(request_budget(config)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for serving without a listener (e.g. in tests).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    /// Run the server until `shutdown` fires and in-flight requests drain,
    /// or the grace period runs out.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            strategy = %self.config.strategy,
            backends = self.pool.len(),
            "Load balancer started"
        );

        let health_task = if self.config.health_check.enabled {
            let scheduler = Arc::new(HealthScheduler::from_config(
                self.pool.clone(),
                Arc::new(TcpProbe),
                &self.config.health_check,
                self.sink.clone(),
            ));
            Some(tokio::spawn(scheduler.run(shutdown.clone())))
        } else {
            tracing::info!("Active health checks disabled");
            None
        };

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.clone().triggered())
            .into_future();

        let grace = Duration::from_secs(self.config.shutdown.grace_period_secs);
        let mut deadline_signal = shutdown;
        let deadline = async move {
            deadline_signal.recv().await;
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            result = serve => result?,
            _ = deadline => {
                tracing::warn!(grace_period = ?grace, "Grace period elapsed, forcing shutdown");
            }
        }

        if let Some(task) = health_task {
            let _ = task.await;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Upper bound on one inbound request.
///
/// Covers reading the body plus the worst-case retry tree: every allowed
/// attempt, each making `retry_limit + 1` calls that run into the per-call
/// timeout, with the (jittered) backoff between them. Per-call timeouts
/// always fire first, so backend failures reach the retry policy.
fn request_budget(config: &ProxyConfig) -> Duration {
    let per_call = Duration::from_secs(config.timeouts.request_secs);
    let retries = &config.retries;

    let backoff: Duration = (0..retries.retry_limit)
        .map(|retry| calculate_backoff(retry, retries.base_delay_ms, retries.max_delay_ms))
        .sum();
    let per_backend = per_call * (retries.retry_limit + 1) + backoff + backoff / 10;

    per_call + per_backend * retries.max_attempt_limit + Duration::from_secs(1)
}

/// Main proxy handler.
/// Buffers the request and lets the dispatcher pick and call a backend.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let declared_len = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_len.is_some_and(|len| len > state.max_body_bytes) {
        metrics::record_request(StatusCode::PAYLOAD_TOO_LARGE.as_u16(), "none", start_time);
        return payload_too_large();
    }

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let error = e.into_inner();
            if error.is::<LengthLimitError>() {
                metrics::record_request(StatusCode::PAYLOAD_TOO_LARGE.as_u16(), "none", start_time);
                return payload_too_large();
            }
            tracing::warn!(error = %error, "Failed to read request body");
            metrics::record_request(StatusCode::BAD_REQUEST.as_u16(), "none", start_time);
            return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
        }
    };
    let request = ProxyRequest::from_parts(parts, body, client_addr);

    tracing::debug!(
        request_id = request.request_id().unwrap_or("unknown"),
        method = %request.method,
        path = %request.uri.path(),
        "Proxying request"
    );

    let response = state.dispatcher.serve(&request, RequestCounters::default()).await;

    let backend = response
        .extensions()
        .get::<ServedBy>()
        .map(|served| served.0.as_str())
        .unwrap_or("none");
    metrics::record_request(response.status().as_u16(), backend, start_time);

    response
}
