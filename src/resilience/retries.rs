//! Retry and failover policy for proxied calls.
//!
//! # Responsibilities
//! - Retry a failed call against the same backend after a growing backoff
//! - After `retry_limit` retries, mark the backend dead and hand the request
//!   back to the dispatcher with `attempts + 1`
//!
//! # Design Decisions
//! - Only transport failures reach this policy; upstream status codes do not
//! - Same-backend retries do not consult the pool again
//! - Two-level bound: `retry_limit` per backend, attempt limit per request

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Response;

use crate::config::RetryConfig;
use crate::dispatch::RequestCounters;
use crate::http::forward::Forward;
use crate::http::request::ProxyRequest;
use crate::load_balancer::Backend;
use crate::observability::{EventSink, LivenessSource, ProxyEvent};
use crate::resilience::backoff::{calculate_backoff, with_jitter};

/// What to do after a proxied call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then call the same backend again with `next`.
    RetrySameBackend { delay: Duration, next: RequestCounters },
    /// Condemn the backend and re-dispatch with `next`.
    FailOver { next: RequestCounters },
}

/// How a proxied call chain against one backend ended.
#[derive(Debug)]
pub enum ProxyOutcome {
    /// The backend produced a response (of any status).
    Completed(Response<Body>),
    /// The backend was marked dead; dispatch again with these counters.
    FailedOver(RequestCounters),
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    retry_limit: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter: bool,
    sink: Arc<dyn EventSink>,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            retry_limit: config.retry_limit,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            jitter: config.jitter,
            sink,
        }
    }

    /// Backoff before the retry that follows `retries` earlier ones.
    pub fn backoff(&self, retries: u32) -> Duration {
        let delay = calculate_backoff(retries, self.base_delay_ms, self.max_delay_ms);
        if self.jitter {
            with_jitter(delay)
        } else {
            delay
        }
    }

    /// Decide the next step for a call that just failed with `counters`.
    pub fn decide(&self, counters: RequestCounters) -> RetryDecision {
        if counters.retries < self.retry_limit {
            RetryDecision::RetrySameBackend {
                delay: self.backoff(counters.retries),
                next: counters.next_retry(),
            }
        } else {
            RetryDecision::FailOver {
                next: counters.next_attempt(),
            }
        }
    }

    /// Call `backend`, retrying it in place until it answers or is condemned.
    pub async fn proxy(
        &self,
        backend: &Backend,
        forwarder: &dyn Forward,
        request: &ProxyRequest,
        counters: RequestCounters,
    ) -> ProxyOutcome {
        let mut counters = counters;
        loop {
            match backend.execute_proxied(forwarder, request).await {
                Ok(response) => return ProxyOutcome::Completed(response),
                Err(error) => tracing::debug!(
                    backend = %backend,
                    attempts = counters.attempts,
                    retries = counters.retries,
                    error = %error,
                    "Proxied call failed"
                ),
            }

            match self.decide(counters) {
                RetryDecision::RetrySameBackend { delay, next } => {
                    self.sink.emit(ProxyEvent::RetryScheduled {
                        backend: backend.to_string(),
                        attempts: next.attempts,
                        retries: next.retries,
                        delay,
                    });
                    tokio::time::sleep(delay).await;
                    counters = next;
                }
                RetryDecision::FailOver { next } => {
                    let was_alive = backend.set_alive(false);
                    if was_alive {
                        self.sink.emit(ProxyEvent::LivenessChanged {
                            backend: backend.to_string(),
                            was_alive,
                            alive: false,
                            source: LivenessSource::Failover,
                        });
                    }
                    self.sink.emit(ProxyEvent::FailedOver {
                        backend: backend.to_string(),
                        attempts: next.attempts,
                    });
                    return ProxyOutcome::FailedOver(next);
                }
            }
        }
    }
}
