use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Site Router Module
///
/// Every front-end page path. The router itself carries no access rule: the
/// access gate layered on top resolves the page, decides, and only then lets
/// the request reach `render_page`.
pub fn site_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::render_page))
        .route("/{*path}", get(handlers::render_page))
}
