//! Route definitions
//!
//! Public feed and file routes plus the authenticated management API under
//! `/api`. Everything is mounted under the path of the public host URL, with
//! the web UI answering any other path below it.

use std::path::Path;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::services::ServeDir;

use super::auth::require_auth;
use super::handlers;
use super::state::AppState;

/// Create the router: `base_path` is empty or starts with `/`
pub fn create_router(
    state: AppState,
    content_root: &Path,
    front: &Path,
    base_path: &str,
) -> Router<AppState> {
    let routes = Router::new()
        .route("/feed/:alias", get(handlers::feed))
        .nest_service("/files", ServeDir::new(content_root))
        .nest("/api", api_routes(state))
        .fallback_service(ServeDir::new(front));

    let router = if base_path.is_empty() {
        routes
    } else {
        Router::new().nest(base_path, routes)
    };

    // Crawlers look for this at the domain root only
    router.route("/robots.txt", get(handlers::robots))
}

/// Management API, behind Basic auth when a credential is configured
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/list", get(handlers::list_channels))
        .route("/channel", post(handlers::create_channel))
        .route(
            "/channel/:channel",
            get(handlers::overview)
                .put(handlers::update_channel)
                .delete(handlers::delete_channel),
        )
        .route("/channel/:channel/upload", post(handlers::upload_podcast))
        .route("/channel/:channel/cover/upload", post(handlers::upload_cover))
        .route("/channel/:channel/cover/:cover", delete(handlers::delete_cover))
        .route(
            "/channel/:channel/podcast/:podcast",
            get(handlers::podcast_info)
                .put(handlers::update_podcast)
                .delete(handlers::delete_podcast),
        )
        // Episodes are far larger than the default request body limit
        .layer(DefaultBodyLimit::disable())
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
