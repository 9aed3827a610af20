//! Server-side access gate for the portal page subtree.
//!
//! The gate runs as middleware in front of the page handler. When a protected
//! page is requested without an administrator session the middleware returns
//! a complete login document and never calls the inner service, so the page
//! body is never loaded, rendered or sent.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use url::Url;

use crate::{
    AppState,
    auth::Viewer,
    config::SiteConfig,
    error::PortalError,
    models::ContentItem,
    repository::RepositoryState,
    routing::normalize_path,
    templates::{self, Templates},
};

/// Slug of the protected portal page.
pub const PORTAL_SLUG: &str = "brads-portal";

/// Query parameter carrying the login outcome back to the portal.
pub const LOGIN_PARAM: &str = "login";

/// The only value the gate ever writes to [`LOGIN_PARAM`].
pub const LOGIN_FAILED: &str = "failed";

/// Path prefix of the administration interface.
const ADMIN_PREFIX: &str = "/admin";

/// Portal classification of a resolved item and its parent.
///
/// Only the item itself and its direct parent are considered; grandchildren of
/// the portal page are not protected.
pub fn is_portal_page(item: Option<&ContentItem>, parent: Option<&ContentItem>) -> bool {
    let Some(item) = item else {
        return false;
    };
    if !item.is_page() {
        return false;
    }
    if item.slug == PORTAL_SLUG {
        return true;
    }
    item.has_parent() && parent.is_some_and(|parent| parent.slug == PORTAL_SLUG)
}

/// `allowed == is_authenticated && has_administrator_role`.
pub fn is_allowed(viewer: &Viewer) -> bool {
    viewer.is_authenticated() && viewer.has_administrator_role()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Frontend,
    Admin,
}

impl RequestKind {
    pub fn from_path(path: &str) -> Self {
        let is_admin = path
            .strip_prefix(ADMIN_PREFIX)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
        if is_admin {
            RequestKind::Admin
        } else {
            RequestKind::Frontend
        }
    }
}

/// Terminal state of the gate for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Passthrough,
    Blocked,
}

/// AccessGate
///
/// Decides whether a request may reach the page renderer. Holds the
/// repository only to look up the resolved item's parent.
#[derive(Clone)]
pub struct AccessGate {
    repo: RepositoryState,
}

impl AccessGate {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// Protected-page classifier. Missing data means "not protected".
    pub async fn is_protected_page(&self, item: Option<&ContentItem>) -> bool {
        let Some(page) = item.filter(|item| item.is_page()) else {
            return false;
        };
        let parent = if page.slug != PORTAL_SLUG && page.has_parent() {
            self.repo.get_content(page.parent_id).await
        } else {
            None
        };
        is_portal_page(item, parent.as_ref())
    }

    pub async fn decide(
        &self,
        kind: RequestKind,
        item: Option<&ContentItem>,
        viewer: &Viewer,
    ) -> GateDecision {
        if kind == RequestKind::Admin {
            return GateDecision::Passthrough;
        }
        if !self.is_protected_page(item).await {
            return GateDecision::Passthrough;
        }
        if is_allowed(viewer) {
            return GateDecision::Passthrough;
        }
        GateDecision::Blocked
    }
}

/// ResolvedContent
///
/// The content item the gate resolved for a passed-through request, handed to
/// the page handler through request extensions so it is not looked up twice.
#[derive(Debug, Clone)]
pub struct ResolvedContent(pub Option<ContentItem>);

/// access_gate
///
/// Middleware wrapping the front-end page routes.
pub async fn access_gate(
    State(state): State<AppState>,
    viewer: Viewer,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let kind = RequestKind::from_path(&path);
    if kind == RequestKind::Admin {
        return next.run(request).await;
    }

    let item = match state.routes.resolve(&path).await {
        Some(id) => state.repo.get_content(id).await,
        None => None,
    };

    let gate = AccessGate::new(state.repo.clone());
    match gate.decide(kind, item.as_ref(), &viewer).await {
        GateDecision::Passthrough => {
            tracing::debug!(path = %path, "gate passthrough");
            request.extensions_mut().insert(ResolvedContent(item));
            next.run(request).await
        }
        GateDecision::Blocked => {
            tracing::info!(
                path = %path,
                authenticated = viewer.is_authenticated(),
                "portal page requested without administrator session, serving login"
            );
            let login_failed = has_failed_login(request.uri().query());
            let permalink = state
                .config
                .site
                .home(&normalize_path(&path).unwrap_or_default());
            match render_login_page(&state.templates, &state.config.site, &permalink, login_failed)
            {
                Ok(html) => takeover(html),
                Err(e) => e.into_response(),
            }
        }
    }
}

/// The takeover response: the login document and nothing else.
fn takeover(html: String) -> Response {
    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, "no-store, no-cache, must-revalidate, max-age=0")],
        Html(html),
    )
        .into_response()
}

fn has_failed_login(query: Option<&str>) -> bool {
    query.is_some_and(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .any(|(key, value)| key == LOGIN_PARAM && value == LOGIN_FAILED)
    })
}

#[derive(Serialize)]
struct LoginPage<'a> {
    site: &'a SiteConfig,
    login_failed: bool,
    login_url: String,
    redirect_url: &'a str,
    lost_password_url: String,
}

/// Renders the standalone login document for a protected permalink.
pub fn render_login_page(
    templates: &Templates,
    site: &SiteConfig,
    permalink: &str,
    login_failed: bool,
) -> Result<String, PortalError> {
    let page = LoginPage {
        site,
        login_failed,
        login_url: site.login_url(),
        redirect_url: permalink,
        lost_password_url: with_query_param(&site.lost_password_url, "redirect_to", permalink),
    };
    templates.render(templates::LOGIN, &page)
}

fn with_query_param(base: &str, key: &str, value: &str) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair(key, value);
            url.to_string()
        }
        Err(_) => base.to_string(),
    }
}

/// Failed-login redirector.
///
/// When the login form was posted from a portal page, returns the referring
/// URL with any existing `login` parameter replaced by `login=failed`.
/// Matching is a plain substring test on the portal slug. Returns `None` when
/// the referrer does not match or is not an absolute URL.
pub fn failed_login_redirect(referrer: &str) -> Option<String> {
    if !referrer.contains(PORTAL_SLUG) {
        return None;
    }
    let mut url = match Url::parse(referrer) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("unusable login referrer: {}", e);
            return None;
        }
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != LOGIN_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(LOGIN_PARAM, LOGIN_FAILED);

    Some(url.to_string())
}
