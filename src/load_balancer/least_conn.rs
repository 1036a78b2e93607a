//! Least Connections load balancing strategy.

use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Least connections selector.
/// Selects the alive backend with the fewest in-flight calls.
///
/// Counts are read one backend at a time without a pool-wide lock, so the
/// result is a best-effort snapshot under concurrent load.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for LeastConnections {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        let mut alive = backends.iter().filter(|b| b.is_alive());
        let mut candidate = alive.next()?;

        // Strictly fewer replaces the candidate; ties keep the lower index.
        for backend in alive {
            if backend.active_connections() < candidate.active_connections() {
                candidate = backend;
            }
        }
        Some(candidate.clone())
    }
}
