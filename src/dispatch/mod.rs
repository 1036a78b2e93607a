//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (buffered), RequestCounters { attempts: 1, retries: 0 }
//!     → dispatcher.rs: attempts > attempt_limit? → 503
//!     → BackendPool::select_peer()            none → 503
//!     → RetryPolicy::proxy(backend)
//!         Completed(response) → client
//!         FailedOver(attempts + 1) → back to the top
//! ```
//!
//! # Design Decisions
//! - Counters are an explicit value threaded through the call chain
//! - The dispatcher keeps no memory of a request between re-entries
//! - Attempt limit is `min(pool size, max_attempt_limit)`, memoized

pub mod counters;
pub mod dispatcher;

pub use counters::RequestCounters;
pub use dispatcher::{DispatchError, Dispatcher};
