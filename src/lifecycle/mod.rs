//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger()
//!
//! Shutdown (shutdown.rs):
//!     trigger → HealthScheduler aborts at next backend boundary
//!             → HTTP server stops accepting, drains in-flight requests
//!             → forced exit after the grace period
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then pool, then background tasks, then listener
//! - Shutdown signal is sticky (watch channel), so late observers never miss it
//! - Shutdown has timeout: forced exit after deadline

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
