mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use bbab_portal::{
    InMemoryRepository,
    auth::hash_password,
    config::Env,
    create_router,
    models::{ContentItem, PostStatus},
};
use common::*;
use tokio::net::TcpListener;
use tower::ServiceExt;

const PASSWORD: &str = "correct horse battery staple";

fn login_request(body: &str, referrer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(referrer) = referrer {
        builder = builder.header(header::REFERER, referrer);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn repo_with_real_password() -> InMemoryRepository {
    InMemoryRepository::new()
        .with_post(page(PORTAL_ID, "brads-portal", 0, "<p>portal</p>"))
        .with_credentials(admin(), hash_password(PASSWORD).unwrap())
}

// --- Takeover ---

#[tokio::test]
async fn test_anonymous_visitor_gets_login_document() {
    let app = app(site_repo()).await;

    let response = app.oneshot(get("/brads-portal/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "no-store, no-cache, must-revalidate, max-age=0"
    );
    let body = body_string(response).await;
    assert!(!body.contains(SECRET_MARKER));
    assert!(body.contains("<title>Login - Brad&#x27;s Bits and Bytes</title>"));
    assert!(body.contains(r#"<form method="post" action="http://localhost:3000/login""#));
    assert!(body.contains(
        r#"<input type="hidden" name="redirect_to" value="http://localhost:3000/brads-portal/">"#
    ));
    assert!(body.contains(
        "http://localhost:3000/lost-password/?redirect_to=http%3A%2F%2Flocalhost%3A3000%2Fbrads-portal%2F"
    ));
    assert!(!body.contains("Invalid username or password"));
}

#[tokio::test]
async fn test_subscriber_is_taken_over_on_child_page() {
    let app = app(site_repo()).await;

    let response = app
        .oneshot(get_as("/brads-portal/add-portfolio", &subscriber()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(!body.contains(SECRET_MARKER));
    assert!(body.contains("Sign in to access your dashboard"));
    assert!(body.contains(r#"value="http://localhost:3000/brads-portal/add-portfolio/""#));
}

#[tokio::test]
async fn test_failed_login_flag_shows_error_banner() {
    let app = app(site_repo()).await;

    let response = app
        .oneshot(get("/brads-portal/?login=failed"))
        .await
        .unwrap();

    let body = body_string(response).await;
    assert!(body.contains("Invalid username or password. Please try again."));
    assert!(!body.contains(SECRET_MARKER));
}

#[tokio::test]
async fn test_administrator_sees_portal_with_widgets() {
    let app = app(site_repo()).await;

    let response = app
        .oneshot(get_as("/brads-portal/", &admin()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains(SECRET_MARKER));
    assert!(body.contains("bbab-portal-stats"));
    assert!(!body.contains("[portal_stats]"));
    assert!(!body.contains("Sign in to access your dashboard"));
}

// --- Pass-through ---

#[tokio::test]
async fn test_public_and_unknown_pages_pass_through() {
    let app = app(site_repo()).await;

    let response = app.clone().oneshot(get("/about/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("<p>About us</p>"));

    let response = app.clone().oneshot(get("/no-such-page/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_grandchild_of_portal_is_not_protected() {
    let app = app(site_repo()).await;

    let response = app
        .oneshot(get("/brads-portal/add-portfolio/archive/"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("grandchild body"));
}

#[tokio::test]
async fn test_private_pages_need_a_session() {
    let private = ContentItem {
        status: PostStatus::Private,
        ..page(50, "team", 0, "<p>team notes</p>")
    };
    let app = app(site_repo().with_post(private)).await;

    let response = app.clone().oneshot(get("/team/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get_as("/team/", &subscriber())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_published_portfolio_entries_are_routed() {
    let repo = site_repo()
        .with_post(portfolio_entry(60, "Shop", PostStatus::Publish, 3))
        .with_post(portfolio_entry(61, "Half done", PostStatus::Draft, 4));
    let app = app(repo).await;

    // The recent-activity card links published entries here.
    let response = app
        .clone()
        .oneshot(get("/portfolio/entry-60/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("<h1>Shop</h1>"));

    let response = app.oneshot(get("/portfolio/entry-61/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// --- Login ---

#[tokio::test]
async fn test_failed_login_from_portal_redirects_with_flag() {
    let app = app(repo_with_real_password()).await;

    let response = app
        .oneshot(login_request(
            "log=brad&pwd=wrong",
            Some("http://localhost:3000/brads-portal/?login=old"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://localhost:3000/brads-portal/?login=failed"
    );
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_failed_login_elsewhere_is_unauthorized() {
    let app = app(repo_with_real_password()).await;

    let response = app
        .clone()
        .oneshot(login_request(
            "log=brad&pwd=wrong",
            Some("http://localhost:3000/blog/"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(login_request("log=nobody&pwd=x", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_successful_login_sets_session_and_redirects() {
    let app = app(repo_with_real_password()).await;

    let response = app
        .oneshot(login_request(
            "log=brad%40example.com&pwd=correct+horse+battery+staple&rememberme=forever&redirect_to=http%3A%2F%2Flocalhost%3A3000%2Fbrads-portal%2F",
            Some("http://localhost:3000/brads-portal/"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://localhost:3000/brads-portal/"
    );
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("portal_session="));
    assert!(cookie.contains("Max-Age=1209600"));
    assert!(cookie.contains("Secure"));
}

// --- Full server round trip ---

async fn spawn_app(repo: InMemoryRepository) -> String {
    let state = state_with(repo, Env::Local);
    state.activate().await;
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn test_login_then_portal_over_http() {
    let address = spawn_app(repo_with_real_password()).await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let response = client
        .get(format!("{}/brads-portal/", address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert!(!response.text().await.unwrap().contains("<p>portal</p>"));

    let response = client
        .post(format!("{}/login", address))
        .form(&[("log", "brad"), ("pwd", PASSWORD)])
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
    let set_cookie = response.headers()[reqwest::header::SET_COOKIE]
        .to_str()
        .unwrap()
        .to_string();
    // No "remember me": the session ends with the browser.
    assert!(!set_cookie.contains("Max-Age"));
    let cookie = set_cookie.split(';').next().unwrap().to_string();

    let response = client
        .get(format!("{}/brads-portal/", address))
        .header(reqwest::header::COOKIE, cookie)
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert!(response.text().await.unwrap().contains("<p>portal</p>"));
}
