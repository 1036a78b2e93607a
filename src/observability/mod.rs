//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Engine components (pool, health, dispatch, retries):
//!     → events.rs (EventSink injected at construction)
//!         → TracingSink: structured log events + metrics
//!         → MemorySink: captured for tests
//!
//! Request path:
//!     → metrics.rs (request counters, latency histogram)
//!
//! Process start:
//!     → logging.rs (subscriber init, env filter)
//! ```
//!
//! # Design Decisions
//! - No process-wide logger handle inside the engine; sinks are passed in
//! - Engine events carry fields only; rendering is the sink's job
//! - Metrics are cheap (atomic increments) and optional

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{EventSink, LivenessSource, MemorySink, ProxyEvent, RejectReason, TracingSink};
