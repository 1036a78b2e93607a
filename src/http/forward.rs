//! Upstream forwarding (the proxy primitive).
//!
//! # Responsibilities
//! - Send one buffered request to one backend
//! - Enforce connect and request timeouts
//! - Stream the upstream response back unchanged
//!
//! # Design Decisions
//! - Only transport failures are errors; upstream 5xx responses pass through
//! - The trait seam lets the dispatch engine run against scripted forwarders
//!   in tests

use std::time::Duration;

use axum::body::Body;
use axum::http::Response;
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

use crate::http::request::ProxyRequest;

/// A forwarding failure: the backend could not be reached or did not answer.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("invalid upstream uri: {0}")]
    InvalidUri(String),

    #[error("backend unreachable: {0}")]
    Unreachable(String),
}

/// Performs the wire-level forwarding of a request to a backend.
pub trait Forward: Send + Sync {
    fn forward<'a>(
        &'a self,
        backend: &'a Url,
        request: &'a ProxyRequest,
    ) -> BoxFuture<'a, Result<Response<Body>, ForwardError>>;
}

/// Forwarder backed by the hyper-util connection-pooling client.
#[derive(Clone)]
pub struct HyperForwarder {
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
}

impl HyperForwarder {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            request_timeout,
        }
    }
}

impl Forward for HyperForwarder {
    fn forward<'a>(
        &'a self,
        backend: &'a Url,
        request: &'a ProxyRequest,
    ) -> BoxFuture<'a, Result<Response<Body>, ForwardError>> {
        Box::pin(async move {
            let upstream = request.to_upstream(backend)?;
            let response = tokio::time::timeout(self.request_timeout, self.client.request(upstream))
                .await
                .map_err(|_| ForwardError::Timeout(self.request_timeout))??;

            let (parts, body) = response.into_parts();
            Ok(Response::from_parts(parts, Body::new(body)))
        })
    }
}
