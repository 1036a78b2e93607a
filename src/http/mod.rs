//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, body buffering)
//!     → request.rs (ProxyRequest, upstream rewrite)
//!     → [dispatcher picks a backend and drives retries]
//!     → forward.rs (hyper client call with timeouts)
//!     → response.rs (local rejections) or upstream response
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{Forward, ForwardError, HyperForwarder};
pub use request::{ProxyRequest, X_REQUEST_ID};
pub use response::{ServedBy, SERVICE_UNAVAILABLE_BODY};
pub use server::{AppState, HttpServer};
