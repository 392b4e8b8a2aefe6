use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::{self, HeaderName},
    middleware::Next,
    response::Response,
};
use opentelemetry::KeyValue;
use tower_http::trace::{MakeSpan, OnResponse};
use tracing::Span;

use super::{HTTP_REQUEST_DURATION, HTTP_REQUESTS_TOTAL};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Route template such as `/api/recipes/{id}`, falling back to the raw path
/// for requests that matched nothing.
fn route_of<B>(request: &http::Request<B>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

#[derive(Clone)]
pub struct HttpMakeSpan;

impl<B> MakeSpan<B> for HttpMakeSpan {
    fn make_span(&mut self, request: &http::Request<B>) -> Span {
        let method = request.method().as_str();
        let route = route_of(request);
        let header = |name| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
        };

        tracing::info_span!(
            "HTTP request",
            otel.name = %format!("{method} {route}"),
            http.method = %method,
            http.route = %route,
            http.target = %request.uri(),
            http.flavor = ?request.version(),
            http.user_agent = header(http::header::USER_AGENT),
            http.request_id = header(X_REQUEST_ID),
            http.response.status_code = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
        )
    }
}

#[derive(Clone)]
pub struct HttpOnResponse;

impl<B> OnResponse<B> for HttpOnResponse {
    fn on_response(self, response: &http::Response<B>, latency: Duration, span: &Span) {
        let status = response.status();

        span.record("http.response.status_code", status.as_u16() as i64);
        span.record(
            "otel.status_code",
            if status.is_server_error() { "ERROR" } else { "OK" },
        );

        tracing::info!(
            http.response.status_code = status.as_u16(),
            latency_ms = latency.as_secs_f64() * 1000.0,
            "finished processing request"
        );
    }
}

/// Counts requests and records latency per method, route template and status.
pub async fn track_http_metrics(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let route = route_of(&request);
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let attributes = [
        KeyValue::new("http.method", method),
        KeyValue::new("http.route", route),
        KeyValue::new("http.status_code", status.to_string()),
        KeyValue::new("http.status_class", format!("{}xx", status / 100)),
    ];

    HTTP_REQUESTS_TOTAL.add(1, &attributes);
    HTTP_REQUEST_DURATION.record(started.elapsed().as_secs_f64() * 1000.0, &attributes);

    response
}
