use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /login
        // Target of the login document's form. Sets the session cookie on success,
        // sends portal visitors back to the portal with `login=failed` otherwise.
        .route("/login", post(handlers::login))
}
