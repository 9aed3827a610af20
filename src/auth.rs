use std::convert::Infallible;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::PortalError,
    models::{ADMINISTRATOR_ROLE, User},
    repository::RepositoryState,
};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "portal_session";

/// Session lifetime without "remember me" (2 days).
pub const SESSION_TTL: Duration = Duration::days(2);

/// Session lifetime with "remember me" (14 days).
pub const REMEMBER_TTL: Duration = Duration::days(14);

/// Claims
///
/// The payload signed into every session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id in the `users` table.
    pub sub: Uuid,
    /// Expiration time, seconds since the epoch.
    pub exp: usize,
    /// Issued at, seconds since the epoch.
    pub iat: usize,
}

/// Issues a signed session token for `user_id` valid for `ttl`.
pub fn issue_token(user_id: Uuid, secret: &str, ttl: Duration) -> Result<String, PortalError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Validates signature and expiry. Any failure yields `None`.
pub fn decode_token(token: &str, secret: &str) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| tracing::debug!("rejected session token: {}", e))
    .ok()
}

pub fn hash_password(password: &str) -> Result<String, PortalError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Checks a password against a stored argon2 hash. A malformed hash never verifies.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Builds the `Set-Cookie` value for a fresh session.
/// Remembered sessions persist across browser restarts; others end with the browser session.
pub fn session_cookie(token: &str, remember: bool, env: &Env) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, token);
    if remember {
        cookie.push_str(&format!("; Max-Age={}", REMEMBER_TTL.num_seconds()));
    }
    if *env == Env::Production {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Finds the session token: `Authorization: Bearer` first, then the session cookie.
fn session_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Resolves the requesting user, if any.
///
/// 1. `Env::Local` only: the `x-user-id` header names a user directly.
/// 2. Otherwise the session token is validated and its subject looked up, so a
///    user deleted after the token was issued is no longer authenticated.
async fn resolve_user<S>(parts: &Parts, state: &S) -> Option<User>
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    let repo = RepositoryState::from_ref(state);
    let config = AppConfig::from_ref(state);

    if config.env == Env::Local {
        let bypass = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok());
        if let Some(user_id) = bypass {
            if let Some(user) = repo.get_user(user_id).await {
                return Some(user);
            }
        }
    }

    let token = session_token(parts)?;
    let claims = decode_token(&token, &config.jwt_secret)?;
    repo.get_user(claims.sub).await
}

/// Viewer
///
/// The auth state of any request, anonymous or not. Extraction never fails;
/// a missing or invalid session simply yields an anonymous viewer.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub user: Option<User>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn has_administrator_role(&self) -> bool {
        self.user
            .as_ref()
            .is_some_and(|user| user.role == ADMINISTRATOR_ROLE)
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer {
            user: resolve_user(parts, state).await,
        })
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers that take this
/// extractor reject anonymous callers with 401 before running.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: String,
}

impl AuthUser {
    pub fn is_administrator(&self) -> bool {
        self.role == ADMINISTRATOR_ROLE
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = resolve_user(parts, state)
            .await
            .ok_or(StatusCode::UNAUTHORIZED)?;
        Ok(AuthUser {
            id: user.id,
            role: user.role,
        })
    }
}
