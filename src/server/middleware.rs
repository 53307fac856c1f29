//! Middleware stack for the HTTP server
//!
//! Request tracing and CORS for the browser-based management UI.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderName, Method, Request},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use super::state::AppState;

/// Extra header accepted from browser clients
pub const CSRF_HEADER: &str = "x-csrf-token";

/// How long browsers may cache a preflight answer
pub const CORS_MAX_AGE: Duration = Duration::from_secs(300);

/// Apply middleware stack to the router
pub fn apply_middleware(router: Router<AppState>) -> Router<AppState> {
    router
        .layer(create_cors_layer())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Any origin may call the API; credentials still go through Basic auth
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(CSRF_HEADER),
        ])
        .expose_headers([header::AUTHORIZATION])
        .max_age(CORS_MAX_AGE)
}
