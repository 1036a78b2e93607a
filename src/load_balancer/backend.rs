//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Track liveness (read on every selection, written by health checks and failover)
//! - Track active proxied calls (for Least Connections LB)
//!
//! Both mutable fields are private atomics; callers only see get/set/track
//! operations, so nothing can bypass the synchronization.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::body::Body;
use axum::http::Response;
use url::Url;

use crate::http::forward::{Forward, ForwardError};
use crate::http::request::ProxyRequest;

/// A single backend server.
#[derive(Debug)]
pub struct Backend {
    url: Url,
    alive: AtomicBool,
    active_connections: AtomicUsize,
}

impl Backend {
    /// Create a new backend. Backends start alive.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            alive: AtomicBool::new(true),
            active_connections: AtomicUsize::new(0),
        }
    }

    /// The backend's immutable address.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Set the liveness flag, returning the previous value.
    pub fn set_alive(&self, alive: bool) -> bool {
        self.alive.swap(alive, Ordering::AcqRel)
    }

    /// Get the current number of in-flight proxied calls.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Count one in-flight call until the returned guard is dropped.
    pub fn track(&self) -> BackendConnectionGuard<'_> {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        BackendConnectionGuard { backend: self }
    }

    /// Forward `request` to this backend while it is counted as active.
    ///
    /// The counter is released exactly once on every exit path: success,
    /// error, or the future being dropped mid-flight.
    pub async fn execute_proxied(
        &self,
        forwarder: &dyn Forward,
        request: &ProxyRequest,
    ) -> Result<Response<Body>, ForwardError> {
        let _guard = self.track();
        forwarder.forward(&self.url, request).await
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// A RAII guard that manages the active connection count.
#[derive(Debug)]
pub struct BackendConnectionGuard<'a> {
    backend: &'a Backend,
}

impl Drop for BackendConnectionGuard<'_> {
    fn drop(&mut self) {
        self.backend.active_connections.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::BoxFuture;
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn backend(addr: &str) -> Backend {
        Backend::new(Url::parse(addr).unwrap())
    }

    struct FailingForwarder;

    impl Forward for FailingForwarder {
        fn forward<'a>(
            &'a self,
            backend: &'a Url,
            _: &'a ProxyRequest,
        ) -> BoxFuture<'a, Result<Response<Body>, ForwardError>> {
            Box::pin(async move { Err(ForwardError::Unreachable(backend.to_string())) })
        }
    }

    /// Holds the call open until released.
    struct GatedForwarder {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    impl Forward for GatedForwarder {
        fn forward<'a>(
            &'a self,
            _: &'a Url,
            _: &'a ProxyRequest,
        ) -> BoxFuture<'a, Result<Response<Body>, ForwardError>> {
            Box::pin(async move {
                self.entered.notify_one();
                self.release.notified().await;
                Ok(Response::new(Body::empty()))
            })
        }
    }

    #[test]
    fn test_backend_creation() {
        let b = backend("http://localhost:3333");
        assert_eq!(b.url().as_str(), "http://localhost:3333/");
        assert!(b.is_alive());
        assert_eq!(b.active_connections(), 0);
    }

    #[test]
    fn test_set_alive_returns_previous() {
        let b = backend("http://localhost:3333");
        assert!(b.set_alive(false));
        assert!(!b.is_alive());
        assert!(!b.set_alive(true));
        assert!(b.is_alive());
    }

    #[test]
    fn test_guard_is_symmetric() {
        let b = backend("http://localhost:3333");
        let g1 = b.track();
        let g2 = b.track();
        assert_eq!(b.active_connections(), 2);
        drop(g1);
        assert_eq!(b.active_connections(), 1);
        drop(g2);
        assert_eq!(b.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_failed_call_restores_count() {
        let b = backend("http://localhost:3333");
        let _held = b.track();
        let before = b.active_connections();

        let result = b.execute_proxied(&FailingForwarder, &ProxyRequest::get("/")).await;
        assert!(matches!(result, Err(ForwardError::Unreachable(_))));
        assert_eq!(b.active_connections(), before);
    }

    #[tokio::test]
    async fn test_in_flight_call_is_counted() {
        let b = Arc::new(backend("http://localhost:3333"));
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let forwarder = GatedForwarder { entered: entered.clone(), release: release.clone() };

        let task = {
            let b = b.clone();
            tokio::spawn(async move {
                b.execute_proxied(&forwarder, &ProxyRequest::get("/"))
                    .await
            })
        };

        entered.notified().await;
        assert_eq!(b.active_connections(), 1);

        release.notify_one();
        assert!(task.await.unwrap().is_ok());
        assert_eq!(b.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_call_restores_count() {
        let b = Arc::new(backend("http://localhost:3333"));
        let entered = Arc::new(Notify::new());
        let forwarder = GatedForwarder {
            entered: entered.clone(),
            release: Arc::new(Notify::new()),
        };

        let task = {
            let b = b.clone();
            tokio::spawn(async move {
                b.execute_proxied(&forwarder, &ProxyRequest::get("/"))
                    .await
            })
        };

        entered.notified().await;
        assert_eq!(b.active_connections(), 1);

        task.abort();
        let _ = task.await;
        assert_eq!(b.active_connections(), 0);
    }
}
