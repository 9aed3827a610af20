use crate::{
    AppState,
    access::{ResolvedContent, failed_login_redirect},
    auth::{
        AuthUser, REMEMBER_TTL, SESSION_TTL, Viewer, issue_token, session_cookie,
        verify_password,
    },
    config::SiteConfig,
    models::{LoginForm, PortalSettings, PostStatus, RouteRefreshResponse, SettingsUpdate},
    templates,
};
use axum::{
    Extension, Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use url::Url;

const NOT_FOUND_BODY: &str = "<!DOCTYPE html><html><body><h1>Not Found</h1></body></html>";

// --- Site ---

/// render_page
///
/// [Site Route] Renders a resolved page with its widget placeholders expanded.
/// Only reachable after the access gate let the request through.
pub async fn render_page(
    State(state): State<AppState>,
    viewer: Viewer,
    Extension(ResolvedContent(item)): Extension<ResolvedContent>,
) -> Response {
    let Some(item) = item else {
        return (StatusCode::NOT_FOUND, Html(NOT_FOUND_BODY)).into_response();
    };
    let visible = match item.status {
        PostStatus::Publish => true,
        PostStatus::Private => viewer.is_authenticated(),
        _ => false,
    };
    if !visible {
        return (StatusCode::NOT_FOUND, Html(NOT_FOUND_BODY)).into_response();
    }

    let body = state.dashboard.expand_placeholders(&item.content).await;
    let page = serde_json::json!({
        "site": &state.config.site,
        "title": &item.title,
        "slug": &item.slug,
        "body": body,
    });
    match state.templates.render(templates::PAGE, &page) {
        Ok(html) => Html(html).into_response(),
        Err(e) => e.into_response(),
    }
}

// --- Login ---

/// login
///
/// [Public Route] Credential check for the login document's form.
///
/// Success issues a session cookie and redirects to `redirect_to`. Failure is
/// handed to the failed-login redirector; a referrer outside the portal gets a
/// plain 401.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.log.trim();
    let user = match state.repo.find_credentials(username).await {
        Some(credentials) if verify_password(&form.pwd, &credentials.password_hash) => {
            Some(credentials.user)
        }
        _ => None,
    };

    let Some(user) = user else {
        tracing::info!(username = %username, "login failed");
        let referrer = headers
            .get(header::REFERER)
            .and_then(|value| value.to_str().ok());
        return match referrer.and_then(failed_login_redirect) {
            Some(target) => Redirect::to(&target).into_response(),
            None => (StatusCode::UNAUTHORIZED, "Invalid username or password.").into_response(),
        };
    };

    let remember = form.remember();
    let ttl = if remember { REMEMBER_TTL } else { SESSION_TTL };
    let token = match issue_token(user.id, &state.config.jwt_secret, ttl) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };
    let target = safe_redirect_target(&state.config.site, form.redirect_to.as_deref());
    tracing::info!(user_id = %user.id, "login succeeded");

    (
        [(header::SET_COOKIE, session_cookie(&token, remember, &state.config.env))],
        Redirect::to(&target),
    )
        .into_response()
}

/// Accepts site-relative paths and absolute URLs on the site's own host;
/// anything else falls back to the home page.
fn safe_redirect_target(site: &SiteConfig, requested: Option<&str>) -> String {
    let fallback = site.home("/");
    let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
        return fallback;
    };
    if requested.starts_with('/') && !requested.starts_with("//") {
        return requested.to_string();
    }
    match Url::parse(requested) {
        Ok(url) if url.host_str().map(str::to_string) == site.host() => requested.to_string(),
        _ => fallback,
    }
}

// --- Admin ---

/// get_settings
///
/// [Admin Route] Reads the portal settings record.
#[utoipa::path(
    get,
    path = "/admin/settings",
    responses(
        (status = 200, description = "Current settings", body = PortalSettings),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn get_settings(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<PortalSettings>, StatusCode> {
    if !auth_user.is_administrator() {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_settings().await))
}

/// update_settings
///
/// [Admin Route] Saves the settings record. Negative values are clamped to 0.
#[utoipa::path(
    put,
    path = "/admin/settings",
    request_body = SettingsUpdate,
    responses(
        (status = 200, description = "Saved settings", body = PortalSettings),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn update_settings(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<SettingsUpdate>,
) -> Result<Json<PortalSettings>, StatusCode> {
    if !auth_user.is_administrator() {
        return Err(StatusCode::FORBIDDEN);
    }
    let saved = state.repo.save_settings(payload.sanitize()).await;
    tracing::info!(
        user_id = %auth_user.id,
        form_id = saved.form_id,
        portal_page_id = saved.portal_page_id,
        "portal settings saved"
    );
    Ok(Json(saved))
}

/// refresh_routes
///
/// [Admin Route] Rebuilds the route table after pages were added or moved.
#[utoipa::path(
    post,
    path = "/admin/routes/refresh",
    responses(
        (status = 200, description = "Route table rebuilt", body = RouteRefreshResponse),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn refresh_routes(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<RouteRefreshResponse>, StatusCode> {
    if !auth_user.is_administrator() {
        return Err(StatusCode::FORBIDDEN);
    }
    let routes = state.routes.refresh(state.repo.as_ref()).await;
    Ok(Json(RouteRefreshResponse { routes }))
}
