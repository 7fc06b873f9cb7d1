use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};

/// Log one line per request with method, path, status and latency.
pub async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_secs_f64() * 1_000.0;
    if status.is_server_error() {
        tracing::error!(%method, %path, status = status.as_u16(), latency_ms, "request failed");
    } else {
        tracing::info!(%method, %path, status = status.as_u16(), latency_ms, "request");
    }

    response
}
