//! Request-path entry point.
//!
//! # Responsibilities
//! - Enforce the per-request attempt limit before any selection
//! - Ask the pool for a peer and run the retry policy against it
//! - Re-dispatch after failover until a backend answers or the request
//!   is rejected with 503

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::Response;
use thiserror::Error;

use crate::config::RetryConfig;
use crate::dispatch::RequestCounters;
use crate::http::forward::Forward;
use crate::http::request::ProxyRequest;
use crate::http::response::{service_unavailable, ServedBy};
use crate::load_balancer::{Backend, BackendPool};
use crate::observability::{EventSink, ProxyEvent, RejectReason};
use crate::resilience::{ProxyOutcome, RetryPolicy};

/// Why a dispatch produced no peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no alive backend in pool")]
    PoolExhausted,

    #[error("attempt {attempts} exceeds limit of {limit}")]
    AttemptLimitExceeded { attempts: u32, limit: u32 },
}

impl DispatchError {
    pub fn reason(&self) -> RejectReason {
        match self {
            DispatchError::PoolExhausted => RejectReason::PoolExhausted,
            DispatchError::AttemptLimitExceeded { .. } => RejectReason::AttemptLimitExceeded,
        }
    }
}

pub struct Dispatcher {
    pool: Arc<BackendPool>,
    forwarder: Arc<dyn Forward>,
    policy: RetryPolicy,
    max_attempt_limit: u32,
    attempt_limit: OnceLock<u32>,
    sink: Arc<dyn EventSink>,
}

impl Dispatcher {
    pub fn new(
        pool: Arc<BackendPool>,
        forwarder: Arc<dyn Forward>,
        config: &RetryConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            pool,
            forwarder,
            policy: RetryPolicy::new(config, sink.clone()),
            max_attempt_limit: config.max_attempt_limit,
            attempt_limit: OnceLock::new(),
            sink,
        }
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    /// `min(pool size, max_attempt_limit)`, computed once.
    pub fn attempt_limit(&self) -> u32 {
        *self.attempt_limit.get_or_init(|| {
            let pool_size = u32::try_from(self.pool.len()).unwrap_or(u32::MAX);
            pool_size.min(self.max_attempt_limit)
        })
    }

    /// Pick the backend for dispatch number `counters.attempts`.
    ///
    /// The attempt limit is checked first; an over-limit request never
    /// touches the pool.
    pub fn select(&self, counters: RequestCounters) -> Result<Arc<Backend>, DispatchError> {
        let limit = self.attempt_limit();
        if counters.attempts > limit {
            return Err(DispatchError::AttemptLimitExceeded {
                attempts: counters.attempts,
                limit,
            });
        }
        self.pool.select_peer().ok_or(DispatchError::PoolExhausted)
    }

    /// Serve one logical request, starting from `counters`.
    pub async fn serve(&self, request: &ProxyRequest, counters: RequestCounters) -> Response<Body> {
        let mut counters = counters;
        loop {
            let backend = match self.select(counters) {
                Ok(backend) => backend,
                Err(e) => {
                    tracing::debug!(
                        request_id = request.request_id().unwrap_or("unknown"),
                        error = %e,
                        "Rejecting request"
                    );
                    self.sink.emit(ProxyEvent::Rejected {
                        reason: e.reason(),
                        attempts: counters.attempts,
                    });
                    return service_unavailable();
                }
            };

            match self
                .policy
                .proxy(&backend, self.forwarder.as_ref(), request, counters)
                .await
            {
                ProxyOutcome::Completed(mut response) => {
                    response.extensions_mut().insert(ServedBy(backend.to_string()));
                    return response;
                }
                ProxyOutcome::FailedOver(next) => counters = next,
            }
        }
    }
}
