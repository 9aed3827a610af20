use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Admin Router Module
///
/// JSON endpoints for the administration interface. Requests under `/admin`
/// are never taken over by the access gate; instead every handler here takes
/// the `AuthUser` extractor (401 when signed out) and checks the
/// administrator role itself (403 otherwise).
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/PUT /admin/settings
        // The single portal settings record. PUT clamps both ids to >= 0.
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        // POST /admin/routes/refresh
        // Rebuilds the page route table without restarting the service.
        .route("/routes/refresh", post(handlers::refresh_routes))
}
