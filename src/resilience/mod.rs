//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Proxied call fails (transport error)
//!     → retries.rs: retries < retry_limit?
//!         yes → backoff.rs delay → same backend again
//!         no  → mark backend dead → dispatcher with attempts + 1
//! ```
//!
//! # Design Decisions
//! - Every retry chain is bounded; no request can loop forever
//! - Backoff grows per retry and is capped
//! - Retry state travels with the request, not the backend

pub mod backoff;
pub mod retries;

pub use retries::{ProxyOutcome, RetryDecision, RetryPolicy};
