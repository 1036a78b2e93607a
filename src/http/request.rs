//! Request buffering and upstream rewriting.
//!
//! # Responsibilities
//! - Buffer the inbound request once so it can be replayed on retry/failover
//! - Rewrite the URI onto a backend's scheme, authority and base path
//! - Strip hop-by-hop headers and append X-Forwarded-For
//!
//! # Design Decisions
//! - The inbound request is preserved; each attempt builds a fresh copy
//! - Body is cheaply clonable (`Bytes`), so replays do not copy payloads

use std::net::SocketAddr;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, Uri, Version};
use url::Url;

use crate::http::forward::ForwardError;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers that apply to a single transport hop and must not be forwarded.
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

/// A fully buffered inbound request.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub client_addr: Option<SocketAddr>,
}

impl ProxyRequest {
    /// Build a request from its parts and an already-collected body.
    pub fn from_parts(
        parts: axum::http::request::Parts,
        body: Bytes,
        client_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            client_addr,
        }
    }

    /// Convenience constructor, mostly for tests.
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::GET,
            uri: Uri::try_from(path).unwrap_or_else(|_| Uri::from_static("/")),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            client_addr: None,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }

    /// Target URI for this request on `backend`.
    pub fn upstream_uri(&self, backend: &Url) -> Result<Uri, ForwardError> {
        let base_path = backend.path().trim_end_matches('/');
        let path_and_query = self
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let mut target = backend.clone();
        target.set_path("");
        target.set_query(None);
        target.set_fragment(None);
        let origin = target.as_str().trim_end_matches('/');

        let joined = format!("{}{}{}", origin, base_path, path_and_query);
        Uri::try_from(joined.as_str()).map_err(|e| ForwardError::InvalidUri(e.to_string()))
    }

    /// Build the request sent to `backend` for one attempt.
    pub fn to_upstream(&self, backend: &Url) -> Result<Request<Body>, ForwardError> {
        let uri = self.upstream_uri(backend)?;

        let mut headers = self.headers.clone();
        for name in &HOP_BY_HOP {
            headers.remove(name);
        }
        // Request bodies are fully buffered, so framing is recomputed by the client.
        headers.remove(header::TRANSFER_ENCODING);

        if let Some(addr) = self.client_addr {
            let client_ip = addr.ip().to_string();
            let forwarded = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
                Some(prior) => format!("{}, {}", prior, client_ip),
                None => client_ip,
            };
            if let Ok(value) = HeaderValue::from_str(&forwarded) {
                headers.insert(X_FORWARDED_FOR, value);
            }
        }

        let mut request = Request::builder()
            .method(self.method.clone())
            .uri(uri)
            .body(Body::from(self.body.clone()))
            .map_err(|e| ForwardError::InvalidUri(e.to_string()))?;
        *request.headers_mut() = headers;
        Ok(request)
    }
}
