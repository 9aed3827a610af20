#![allow(dead_code)]

use std::sync::Arc;

use axum::{Router, body::Body, http::Request, response::Response};
use bbab_portal::{
    AppState, InMemoryRepository,
    auth::{SESSION_TTL, issue_token},
    config::{AppConfig, Env},
    create_router,
    models::{ContentItem, PORTFOLIO_TYPE, PostStatus, User},
};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

// --- Fixtures ---

/// Marker string embedded in every protected page body.
pub const SECRET_MARKER: &str = "TOP-SECRET-PORTAL-CONTENT";

pub const PORTAL_ID: i64 = 1;
pub const CHILD_ID: i64 = 2;
pub const GRANDCHILD_ID: i64 = 3;
pub const ABOUT_ID: i64 = 4;

pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
}

pub fn item(id: i64, post_type: &str, slug: &str, parent_id: i64) -> ContentItem {
    ContentItem {
        id,
        post_type: post_type.to_string(),
        slug: slug.to_string(),
        parent_id,
        title: slug.to_string(),
        content: String::new(),
        status: PostStatus::Publish,
        created_at: day(1),
        modified_at: day(1),
    }
}

pub fn page(id: i64, slug: &str, parent_id: i64, content: &str) -> ContentItem {
    ContentItem {
        content: content.to_string(),
        ..item(id, "page", slug, parent_id)
    }
}

pub fn portfolio_entry(id: i64, title: &str, status: PostStatus, modified: u32) -> ContentItem {
    ContentItem {
        title: title.to_string(),
        status,
        created_at: day(1),
        modified_at: day(modified),
        ..item(id, PORTFOLIO_TYPE, &format!("entry-{}", id), 0)
    }
}

pub fn admin() -> User {
    User {
        id: Uuid::from_u128(1),
        login: "brad".to_string(),
        email: "brad@example.com".to_string(),
        role: "administrator".to_string(),
    }
}

pub fn subscriber() -> User {
    User {
        id: Uuid::from_u128(2),
        login: "reader".to_string(),
        email: "reader@example.com".to_string(),
        role: "subscriber".to_string(),
    }
}

/// A site with the portal, one child, one grandchild and a public page,
/// plus an administrator and a subscriber. Password hashes are placeholders.
pub fn site_repo() -> InMemoryRepository {
    InMemoryRepository::new()
        .with_post(page(
            PORTAL_ID,
            "brads-portal",
            0,
            &format!("<p>{}</p>[portal_stats]", SECRET_MARKER),
        ))
        .with_post(page(
            CHILD_ID,
            "add-portfolio",
            PORTAL_ID,
            &format!("<p>{}-child</p>", SECRET_MARKER),
        ))
        .with_post(page(GRANDCHILD_ID, "archive", CHILD_ID, "<p>grandchild body</p>"))
        .with_post(page(ABOUT_ID, "about", 0, "<p>About us</p>"))
        .with_credentials(admin(), "unused")
        .with_credentials(subscriber(), "unused")
}

// --- State & Router ---

pub fn config(env: Env) -> AppConfig {
    AppConfig {
        env,
        ..AppConfig::default()
    }
}

pub fn state_with(repo: InMemoryRepository, env: Env) -> AppState {
    AppState::new(Arc::new(repo), config(env)).expect("templates load")
}

/// Router over `repo` with the route table activated.
pub async fn app(repo: InMemoryRepository) -> Router {
    let state = state_with(repo, Env::Production);
    state.activate().await;
    create_router(state)
}

pub fn token_for(user: &User) -> String {
    issue_token(user.id, &AppConfig::default().jwt_secret, SESSION_TTL).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_as(uri: &str, user: &User) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("cookie", format!("portal_session={}", token_for(user)))
        .body(Body::empty())
        .unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
