use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::CompressionLevel;

use super::handlers::{items_html, items_json, ping, style};
use crate::state::AppState;

/// Upper bound on a whole request, cold scrape included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/ping", get(ping))
        .route("/api", get(items_json))
        .route("/", get(items_html))
        .route("/style.css", get(style))
        .with_state(state);
    with_middleware(router)
}

/// Gzip responses, a request timeout and a 500 for panicking handlers.
pub fn with_middleware(router: Router) -> Router {
    router
        .layer(CompressionLayer::new().quality(CompressionLevel::Precise(5)))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CatchPanicLayer::new())
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
