//! Locally generated responses.
//!
//! Rejections never carry internal detail (backend addresses, counters);
//! those go to the event sink only.

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};

pub const SERVICE_UNAVAILABLE_BODY: &str = "Service not available";

/// Marks which backend produced a response. Kept in response extensions for
/// metrics and logging; never serialized to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedBy(pub String);

fn plain(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

/// The 503 returned for every rejected request.
pub fn service_unavailable() -> Response<Body> {
    plain(StatusCode::SERVICE_UNAVAILABLE, SERVICE_UNAVAILABLE_BODY)
}

pub fn payload_too_large() -> Response<Body> {
    plain(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
}
