//! Backend pool management.
//!
//! # Responsibilities
//! - Own the ordered, fixed set of backends
//! - Apply the configured strategy to select a peer
//! - Expose pool introspection (size, membership, liveness)

use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::config::validation::{parse_backend_url, ValidationError};
use crate::config::Strategy;
use crate::load_balancer::{
    backend::Backend, least_conn::LeastConnections, round_robin::RoundRobin, LoadBalancer,
};

/// Error building a pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("backend pool must contain at least one backend")]
    Empty,

    #[error(transparent)]
    InvalidBackend(#[from] ValidationError),
}

/// The ordered set of backends plus the selection strategy.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    strategy: Strategy,
    balancer: Box<dyn LoadBalancer>,
}

impl BackendPool {
    /// Create a pool from already-parsed backend URLs.
    pub fn new(urls: Vec<Url>, strategy: Strategy) -> Result<Self, PoolError> {
        if urls.is_empty() {
            return Err(PoolError::Empty);
        }

        let backends = urls.into_iter().map(|u| Arc::new(Backend::new(u))).collect();
        let balancer: Box<dyn LoadBalancer> = match strategy {
            Strategy::RoundRobin => Box::new(RoundRobin::new()),
            Strategy::LeastConnections => Box::new(LeastConnections::new()),
        };

        Ok(Self {
            backends,
            strategy,
            balancer,
        })
    }

    /// Create a pool from configured address strings.
    pub fn from_addresses<S: AsRef<str>>(
        addresses: &[S],
        strategy: Strategy,
    ) -> Result<Self, PoolError> {
        let urls = addresses
            .iter()
            .map(|a| parse_backend_url(a.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(urls, strategy)
    }

    /// Select an alive backend, or `None` when every backend is dead.
    pub fn select_peer(&self) -> Option<Arc<Backend>> {
        let peer = self.balancer.next_server(&self.backends);
        if peer.is_none() {
            tracing::debug!(backend_count = self.backends.len(), "No alive backends found in pool");
        }
        peer
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// Always false: construction rejects an empty pool.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// All backends in pool order.
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.backends.iter().any(|b| b.url() == url)
    }

    pub fn alive_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_alive()).count()
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_creation() {
        let pool =
            BackendPool::from_addresses(&["http://localhost:3333"], Strategy::RoundRobin).unwrap();
        assert_eq!(pool.len(), 1);
        assert!(!pool.is_empty());
        assert_eq!(pool.strategy(), Strategy::RoundRobin);
        assert!(pool.contains(&Url::parse("http://localhost:3333").unwrap()));
        assert!(!pool.contains(&Url::parse("http://localhost:3334").unwrap()));
    }

    #[test]
    fn test_empty_pool_rejected() {
        let err = BackendPool::new(Vec::new(), Strategy::LeastConnections).unwrap_err();
        assert!(matches!(err, PoolError::Empty));
    }

    #[test]
    fn test_invalid_address_rejected() {
        let err = BackendPool::from_addresses(&["not a url"], Strategy::RoundRobin).unwrap_err();
        assert!(matches!(err, PoolError::InvalidBackend(_)));
    }

    #[test]
    fn test_next_index_iteration() {
        let pool = BackendPool::from_addresses(
            &["http://localhost:3333", "http://localhost:3334", "http://localhost:3335"],
            Strategy::RoundRobin,
        )
        .unwrap();

        for _ in 0..5 {
            pool.select_peer();
        }
        // Five selections leave the cursor at slot 2.
        let peer = pool.select_peer().unwrap();
        assert_eq!(peer.url().as_str(), "http://localhost:3335/");
    }

    #[test]
    fn test_single_backend_pool() {
        let pool =
            BackendPool::from_addresses(&["http://localhost:3333"], Strategy::RoundRobin).unwrap();
        for _ in 0..3 {
            assert!(Arc::ptr_eq(&pool.select_peer().unwrap(), &pool.backends()[0]));
        }
        pool.backends()[0].set_alive(false);
        assert!(pool.select_peer().is_none());
        assert_eq!(pool.alive_count(), 0);
    }

    #[test]
    fn test_least_connections_pool_prefers_idle_backend() {
        let pool = BackendPool::from_addresses(
            &["http://localhost:3333", "http://localhost:3334"],
            Strategy::LeastConnections,
        )
        .unwrap();

        let first = pool.select_peer().unwrap();
        let _busy = first.track();
        let second = pool.select_peer().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.active_connections(), 0);
    }
}
