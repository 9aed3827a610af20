use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// PortalError
///
/// Infrastructure failures. Behavioral outcomes (not protected, takeover,
/// failed login) are never errors; these only surface when rendering or
/// session plumbing breaks.
#[derive(thiserror::Error, Debug)]
pub enum PortalError {
    #[error("template rendering failed: {0}")]
    Template(#[from] tera::Error),

    #[error("session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing error: {0}")]
    Password(String),
}

impl From<argon2::password_hash::Error> for PortalError {
    fn from(e: argon2::password_hash::Error) -> Self {
        Self::Password(e.to_string())
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        // Detail stays in the logs; clients only see a generic message.
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
