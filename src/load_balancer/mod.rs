//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher asks for a peer
//!     → pool.rs (fixed, ordered set of backends)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through backends)
//!         - least_conn.rs (pick backend with fewest connections)
//!     → backend.rs (liveness + in-flight accounting)
//!     → Return backend or None
//! ```
//!
//! # Design Decisions
//! - Strategy is chosen once at startup for the whole pool
//! - Dead backends excluded from selection
//! - No pool-wide lock: per-backend atomics plus one atomic cursor

use std::fmt::Debug;
use std::sync::Arc;

pub mod backend;
pub mod least_conn;
pub mod pool;
pub mod round_robin;

pub use backend::Backend;
pub use pool::{BackendPool, PoolError};

/// A peer selection algorithm.
pub trait LoadBalancer: Send + Sync + Debug {
    /// Pick an alive backend from `backends`, or `None` if all are dead.
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}
