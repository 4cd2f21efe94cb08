use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// One log line per request; 5xx responses at error level.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let usec = start.elapsed().as_micros();
    if status.is_server_error() {
        log::error!(target: "http", "{} {} {} {}us", method, uri, status.as_u16(), usec);
    } else {
        log::info!(target: "http", "{} {} {} {}us", method, uri, status.as_u16(), usec);
    }

    response
}
