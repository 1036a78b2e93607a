//! Structured engine events.
//!
//! The pool, health scheduler, dispatcher and retry policy never log directly.
//! Each one is constructed with an [`EventSink`] and reports facts through it;
//! the sink decides how they are rendered (tracing, metrics, or in-memory
//! capture for tests).

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::observability::metrics;

/// What caused a liveness transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessSource {
    /// The periodic health scheduler probed the backend.
    HealthCheck,
    /// The retry policy gave up on the backend after exhausting its retries.
    Failover,
}

impl LivenessSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LivenessSource::HealthCheck => "health_check",
            LivenessSource::Failover => "failover",
        }
    }
}

/// Why a request was answered with service-unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No alive backend at selection time.
    PoolExhausted,
    /// The request already tried as many backends as allowed.
    AttemptLimitExceeded,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::PoolExhausted => "pool_exhausted",
            RejectReason::AttemptLimitExceeded => "attempt_limit_exceeded",
        }
    }
}

/// A fact reported by the dispatch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyEvent {
    LivenessChanged {
        backend: String,
        was_alive: bool,
        alive: bool,
        source: LivenessSource,
    },
    RetryScheduled {
        backend: String,
        attempts: u32,
        retries: u32,
        delay: Duration,
    },
    FailedOver {
        backend: String,
        attempts: u32,
    },
    Rejected {
        reason: RejectReason,
        attempts: u32,
    },
    HealthCycleAborted {
        checked: usize,
        total: usize,
    },
}

/// Destination for engine events.
pub trait EventSink: Send + Sync + fmt::Debug {
    fn emit(&self, event: ProxyEvent);
}

/// Sink that renders events as `tracing` events and Prometheus metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    pub fn shared() -> Arc<dyn EventSink> {
        Arc::new(TracingSink)
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: ProxyEvent) {
        match event {
            ProxyEvent::LivenessChanged { backend, was_alive, alive, source } => {
                if alive {
                    tracing::info!(
                        backend = %backend,
                        was_alive,
                        alive,
                        source = source.as_str(),
                        "Backend marked alive"
                    );
                } else {
                    tracing::warn!(
                        backend = %backend,
                        was_alive,
                        alive,
                        source = source.as_str(),
                        "Backend marked dead"
                    );
                }
                metrics::record_backend_health(&backend, alive);
            }
            ProxyEvent::RetryScheduled { backend, attempts, retries, delay } => {
                tracing::info!(
                    backend = %backend,
                    attempts,
                    retries,
                    delay = ?delay,
                    "Retrying request against same backend"
                );
                metrics::record_retry(&backend);
            }
            ProxyEvent::FailedOver { backend, attempts } => {
                tracing::warn!(backend = %backend, attempts, "Retries exhausted, failing over");
                metrics::record_failover(&backend);
            }
            ProxyEvent::Rejected { reason, attempts } => {
                tracing::warn!(reason = reason.as_str(), attempts, "Service not available");
                metrics::record_rejection(reason.as_str());
            }
            ProxyEvent::HealthCycleAborted { checked, total } => {
                tracing::info!(checked, total, "Gracefully shutting down health check");
            }
        }
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ProxyEvent>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of all events emitted so far, in order.
    pub fn events(&self) -> Vec<ProxyEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: ProxyEvent) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
    }
}
