use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access gate: protected-page classifier, takeover middleware, failed-login redirector.
pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routing;
pub mod templates;
pub mod widgets;

// Routing segregation (public, site pages, admin).
pub mod routes;
use routes::{admin, public, site};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::PortalError;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use routing::RouteTable;
pub use templates::Templates;
pub use widgets::Dashboard;

/// ApiDoc
///
/// OpenAPI description of the JSON administration endpoints, served at
/// `/api-docs/openapi.json`. The HTML page routes are not part of it.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::get_settings, handlers::update_settings, handlers::refresh_routes),
    components(schemas(
        models::PortalSettings,
        models::SettingsUpdate,
        models::RouteRefreshResponse,
    )),
    tags((name = "bbab-portal", description = "Portal administration API"))
)]
struct ApiDoc;

/// AppState
///
/// The single container of injected collaborators, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Content, user and settings store.
    pub repo: RepositoryState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
    /// Path → page id table, refreshed by the lifecycle hooks.
    pub routes: RouteTable,
    pub templates: Templates,
    pub dashboard: Dashboard,
}

impl AppState {
    /// Wires the collaborators together. Fails only if the embedded templates do not parse.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Result<Self, PortalError> {
        let templates = Templates::load()?;
        let dashboard = Dashboard::new(repo.clone(), config.site.clone(), templates.clone());
        Ok(Self {
            repo,
            config,
            routes: RouteTable::new(),
            templates,
            dashboard,
        })
    }

    /// Lifecycle: portal switched on.
    pub async fn activate(&self) -> usize {
        self.routes.activate(self.repo.as_ref()).await
    }

    /// Lifecycle: portal switched off.
    pub async fn deactivate(&self) -> usize {
        self.routes.deactivate(self.repo.as_ref()).await
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing structure. Site pages sit behind the access gate;
/// admin JSON routes check the administrator role in their handlers.
pub fn create_router(state: AppState) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/admin", admin::admin_routes())
        // The gate runs before the page handler and may answer on its behalf.
        .merge(site::site_routes().route_layer(middleware::from_fn_with_state(
            state.clone(),
            access::access_gate,
        )))
        .with_state(state);

    base_router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Span for every request, correlated by the `x-request-id` header set above.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
