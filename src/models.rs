use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Content type of ordinary site pages. Only pages can be protected.
pub const PAGE_TYPE: &str = "page";

/// The custom content type summarized by the dashboard widgets.
pub const PORTFOLIO_TYPE: &str = "bbab_portfolio";

/// Front-end path segment under which published portfolio entries are served.
pub const PORTFOLIO_BASE: &str = "portfolio";

/// Meta key holding a portfolio entry's project status.
pub const PROJECT_STATUS_META: &str = "_bbab_project_status";

/// Role that may view the portal.
pub const ADMINISTRATOR_ROLE: &str = "administrator";

// --- Identity ---

/// User
///
/// The identity record resolved from a session token. Credentials live in the
/// same table but are never loaded into this struct.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    /// Single fixed role name, e.g. `administrator` or `subscriber`.
    pub role: String,
}

/// Credentials
///
/// A user together with the stored argon2 password hash. Only used by the
/// login handler.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

// --- Content ---

/// PostStatus
///
/// Publication status of a content item, stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Publish,
    Draft,
    Pending,
    Private,
    Trash,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Publish => "publish",
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Private => "private",
            PostStatus::Trash => "trash",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publish" => Ok(PostStatus::Publish),
            "draft" => Ok(PostStatus::Draft),
            "pending" => Ok(PostStatus::Pending),
            "private" => Ok(PostStatus::Private),
            "trash" => Ok(PostStatus::Trash),
            other => Err(format!("unknown post status '{}'", other)),
        }
    }
}

/// ContentItem
///
/// A resolved content record from the `posts` table. `parent_id` is 0 when the
/// item has no parent.
#[derive(Debug, Clone, Serialize)]
pub struct ContentItem {
    pub id: i64,
    pub post_type: String,
    pub slug: String,
    pub parent_id: i64,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn has_parent(&self) -> bool {
        self.parent_id != 0
    }

    pub fn is_page(&self) -> bool {
        self.post_type == PAGE_TYPE
    }
}

/// PortfolioEntry
///
/// A `bbab_portfolio` record as listed by the dashboard widgets.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioEntry {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

// --- Settings ---

/// PortalSettings
///
/// The single persisted configuration record. Both fields are non-negative;
/// `portal_page_id` is 0 when unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PortalSettings {
    pub form_id: i64,
    pub portal_page_id: i64,
}

/// SettingsUpdate
///
/// Input schema for PUT /admin/settings. Values are clamped on save, never rejected.
#[derive(Debug, Clone, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub form_id: i64,
    #[serde(default)]
    pub portal_page_id: i64,
}

impl SettingsUpdate {
    /// Clamps both fields to non-negative integers.
    pub fn sanitize(&self) -> PortalSettings {
        PortalSettings {
            form_id: self.form_id.max(0),
            portal_page_id: self.portal_page_id.max(0),
        }
    }
}

/// RouteRefreshResponse
///
/// Output schema for POST /admin/routes/refresh.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RouteRefreshResponse {
    /// Number of page paths in the refreshed table.
    pub routes: usize,
}

/// LoginForm
///
/// The form posted by the login document. Field names follow the host
/// platform's login endpoint.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoginForm {
    pub log: String,
    pub pwd: String,
    #[serde(default)]
    pub rememberme: Option<String>,
    #[serde(default)]
    pub redirect_to: Option<String>,
}

impl LoginForm {
    pub fn remember(&self) -> bool {
        self.rememberme.as_deref() == Some("forever")
    }
}
