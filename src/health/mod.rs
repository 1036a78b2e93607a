//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! scheduler.rs (one long-lived task):
//!     interval tick
//!     → for each backend, in pool order:
//!         probe.rs (TCP connect, bounded timeout)  ┐ first to resolve wins
//!         shutdown signal                          ┘
//!     → Backend::set_alive(verdict)
//! ```
//!
//! # Design Decisions
//! - Backends are probed sequentially; a cycle never fans out
//! - A cancelled probe yields no verdict, never "dead"
//! - Liveness may be stale by up to one interval; readers take no lock

pub mod probe;
pub mod scheduler;

pub use probe::{HealthProbe, TcpProbe};
pub use scheduler::{CycleOutcome, HealthScheduler, SchedulerState};
