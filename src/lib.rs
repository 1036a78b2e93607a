//! HTTP load balancer library.
//!
//! Spreads inbound requests over a fixed pool of backends, retries transport
//! failures against the same backend, fails over to another one when a
//! backend stops answering, and keeps liveness fresh with periodic probes.

// Core subsystems
pub mod config;
pub mod dispatch;
pub mod http;

// Traffic management
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ProxyConfig;
pub use dispatch::Dispatcher;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::BackendPool;
