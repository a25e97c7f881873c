use std::any::Any;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_http::timeout::TimeoutLayer;
use tracing::{Instrument, error, info, info_span};

use crate::id;
use crate::stats::{self, Counter};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The id minted for a request, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub async fn request_id(mut request: Request, next: Next) -> Response {
    let request_id = id::must_generate();
    let header = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = &header {
        request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
    }
    request.extensions_mut().insert(RequestId(request_id));

    let mut response = next.run(request).await;
    if let Some(value) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

pub async fn log_request(request: Request, next: Next) -> Response {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();
    let addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0.to_string())
        .unwrap_or_default();

    let span = info_span!(
        "request",
        svc = "http",
        request_id = %request_id,
        addr = %addr,
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        info!("connected");
        let start = Instant::now();
        let response = next.run(request).await;
        info!(
            status = response.status().as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "disconnected"
        );
        response
    }
    .instrument(span)
    .await
}

pub async fn record_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;

    stats::incr(Counter::HttpRequests);
    stats::measure(Counter::HttpRequestMicros, start.elapsed());
    if response.status().is_server_error() {
        stats::incr(Counter::HttpServerErrors);
    }
    response
}

/// Answers 408 when a request is still being handled after `timeout`.
pub fn request_timeout(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Turns a handler panic into a 500 so one bad request cannot take the
/// server down.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    error!(panic = %detail, "handler panicked");
    stats::incr(Counter::HttpPanics);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error\n").into_response()
}
