use crate::models::{
    ContentItem, Credentials, PAGE_TYPE, PORTFOLIO_TYPE, PROJECT_STATUS_META, PortalSettings,
    PortfolioEntry, PostStatus, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Repository Trait
///
/// The abstract contract for every read the portal makes against the host
/// platform's store, plus the single settings record it owns.
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    // Matches on either the login name or the email address.
    async fn find_credentials(&self, login: &str) -> Option<Credentials>;

    // --- Content ---
    async fn get_content(&self, id: i64) -> Option<ContentItem>;
    // Every routable page (published or private), used to build the route table.
    async fn list_pages(&self) -> Vec<ContentItem>;

    // --- Portfolio ---
    async fn post_type_exists(&self, post_type: &str) -> bool;
    // Entries in any of `statuses`, most recently modified first.
    async fn list_portfolio(&self, statuses: &[PostStatus], limit: i64) -> Vec<PortfolioEntry>;
    async fn count_portfolio(&self, status: PostStatus) -> i64;
    async fn count_portfolio_with_project_status(
        &self,
        status: PostStatus,
        project_status: &str,
    ) -> i64;

    // --- Settings ---
    async fn get_settings(&self) -> PortalSettings;
    async fn save_settings(&self, settings: PortalSettings) -> PortalSettings;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostRow
///
/// Raw `posts` row. Status is kept as text and parsed on conversion so an
/// unknown status drops the row instead of failing the whole query.
#[derive(Debug, FromRow)]
struct PostRow {
    id: i64,
    post_type: String,
    slug: String,
    parent_id: i64,
    title: String,
    content: String,
    status: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

impl PostRow {
    fn into_item(self) -> Option<ContentItem> {
        let status = match self.status.parse() {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(post_id = self.id, "skipping post: {}", e);
                return None;
            }
        };
        Some(ContentItem {
            id: self.id,
            post_type: self.post_type,
            slug: self.slug,
            parent_id: self.parent_id,
            title: self.title,
            content: self.content,
            status,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PortfolioRow {
    id: i64,
    slug: String,
    title: String,
    status: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

impl PortfolioRow {
    fn into_entry(self) -> Option<PortfolioEntry> {
        let status = self.status.parse().ok()?;
        Some(PortfolioEntry {
            id: self.id,
            slug: self.slug,
            title: self.title,
            status,
            created_at: self.created_at,
            modified_at: self.modified_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CredentialsRow {
    id: Uuid,
    login: String,
    email: String,
    role: String,
    password_hash: String,
}

const POST_COLUMNS: &str =
    "id, post_type, slug, parent_id, title, content, status, created_at, modified_at";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// get_user
    ///
    /// Loads the identity fields only; the password hash never leaves `find_credentials`.
    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>("SELECT id, login, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
    }

    async fn find_credentials(&self, login: &str) -> Option<Credentials> {
        let row = sqlx::query_as::<_, CredentialsRow>(
            "SELECT id, login, email, role, password_hash FROM users WHERE login = $1 OR email = $1 LIMIT 1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("find_credentials error: {:?}", e);
            None
        })?;

        Some(Credentials {
            user: User {
                id: row.id,
                login: row.login,
                email: row.email,
                role: row.role,
            },
            password_hash: row.password_hash,
        })
    }

    async fn get_content(&self, id: i64) -> Option<ContentItem> {
        let sql = format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS);
        sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_content error: {:?}", e);
                None
            })
            .and_then(PostRow::into_item)
    }

    async fn list_pages(&self) -> Vec<ContentItem> {
        let sql = format!(
            "SELECT {} FROM posts WHERE post_type = $1 AND status IN ('publish', 'private') ORDER BY id",
            POST_COLUMNS
        );
        match sqlx::query_as::<_, PostRow>(&sql)
            .bind(PAGE_TYPE)
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows.into_iter().filter_map(PostRow::into_item).collect(),
            Err(e) => {
                tracing::error!("list_pages error: {:?}", e);
                vec![]
            }
        }
    }

    async fn post_type_exists(&self, post_type: &str) -> bool {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM post_types WHERE name = $1)")
            .bind(post_type)
            .fetch_one(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("post_type_exists error: {:?}", e);
                false
            })
    }

    /// list_portfolio
    ///
    /// Ties on `modified_at` fall back to id so repeated renders list entries in the same order.
    async fn list_portfolio(&self, statuses: &[PostStatus], limit: i64) -> Vec<PortfolioEntry> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let result = sqlx::query_as::<_, PortfolioRow>(
            r#"
            SELECT id, slug, title, status, created_at, modified_at
            FROM posts
            WHERE post_type = $1 AND status = ANY($2)
            ORDER BY modified_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(PORTFOLIO_TYPE)
        .bind(statuses)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;

        match result {
            Ok(rows) => rows.into_iter().filter_map(PortfolioRow::into_entry).collect(),
            Err(e) => {
                tracing::error!("list_portfolio error: {:?}", e);
                vec![]
            }
        }
    }

    async fn count_portfolio(&self, status: PostStatus) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM posts WHERE post_type = $1 AND status = $2",
        )
        .bind(PORTFOLIO_TYPE)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("count_portfolio error: {:?}", e);
            0
        })
    }

    async fn count_portfolio_with_project_status(
        &self,
        status: PostStatus,
        project_status: &str,
    ) -> i64 {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM posts p
            JOIN post_meta m ON m.post_id = p.id AND m.meta_key = $1
            WHERE p.post_type = $2 AND p.status = $3 AND m.meta_value = $4
            "#,
        )
        .bind(PROJECT_STATUS_META)
        .bind(PORTFOLIO_TYPE)
        .bind(status.as_str())
        .bind(project_status)
        .fetch_one(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("count_portfolio_with_project_status error: {:?}", e);
            0
        })
    }

    /// get_settings
    ///
    /// A missing row reads as the all-zero default.
    async fn get_settings(&self) -> PortalSettings {
        sqlx::query_as::<_, PortalSettings>(
            "SELECT form_id, portal_page_id FROM portal_settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_settings error: {:?}", e);
            None
        })
        .unwrap_or_default()
    }

    async fn save_settings(&self, settings: PortalSettings) -> PortalSettings {
        sqlx::query_as::<_, PortalSettings>(
            r#"
            INSERT INTO portal_settings (id, form_id, portal_page_id) VALUES (1, $1, $2)
            ON CONFLICT (id) DO UPDATE SET form_id = EXCLUDED.form_id, portal_page_id = EXCLUDED.portal_page_id
            RETURNING form_id, portal_page_id
            "#,
        )
        .bind(settings.form_id)
        .bind(settings.portal_page_id)
        .fetch_one(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("save_settings error: {:?}", e);
            settings
        })
    }
}

/// InMemoryRepository
///
/// A `Repository` over fixed in-process data, used by the test suites and for
/// running the gate without a database. Only the settings record is mutable.
pub struct InMemoryRepository {
    users: Vec<Credentials>,
    posts: Vec<ContentItem>,
    project_statuses: Vec<(i64, String)>,
    portfolio_registered: bool,
    settings: RwLock<PortalSettings>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self {
            users: vec![],
            posts: vec![],
            project_statuses: vec![],
            portfolio_registered: true,
            settings: RwLock::new(PortalSettings::default()),
        }
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(mut self, user: User, password_hash: impl Into<String>) -> Self {
        self.users.push(Credentials {
            user,
            password_hash: password_hash.into(),
        });
        self
    }

    pub fn with_post(mut self, item: ContentItem) -> Self {
        self.posts.push(item);
        self
    }

    pub fn with_project_status(mut self, post_id: i64, project_status: &str) -> Self {
        self.project_statuses
            .push((post_id, project_status.to_string()));
        self
    }

    /// Simulates the portfolio content type not being registered.
    pub fn without_portfolio_type(mut self) -> Self {
        self.portfolio_registered = false;
        self
    }

    fn project_status_of(&self, post_id: i64) -> Option<String> {
        self.project_statuses
            .iter()
            .find(|(id, _)| *id == post_id)
            .map(|(_, value)| value.clone())
    }

    fn portfolio(&self) -> impl Iterator<Item = &ContentItem> {
        self.posts
            .iter()
            .filter(|p| self.portfolio_registered && p.post_type == PORTFOLIO_TYPE)
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.users
            .iter()
            .find(|c| c.user.id == id)
            .map(|c| c.user.clone())
    }

    async fn find_credentials(&self, login: &str) -> Option<Credentials> {
        self.users
            .iter()
            .find(|c| c.user.login == login || c.user.email == login)
            .cloned()
    }

    async fn get_content(&self, id: i64) -> Option<ContentItem> {
        self.posts.iter().find(|p| p.id == id).cloned()
    }

    async fn list_pages(&self) -> Vec<ContentItem> {
        self.posts
            .iter()
            .filter(|p| p.is_page() && matches!(p.status, PostStatus::Publish | PostStatus::Private))
            .cloned()
            .collect()
    }

    async fn post_type_exists(&self, post_type: &str) -> bool {
        match post_type {
            PAGE_TYPE => true,
            PORTFOLIO_TYPE => self.portfolio_registered,
            _ => false,
        }
    }

    async fn list_portfolio(&self, statuses: &[PostStatus], limit: i64) -> Vec<PortfolioEntry> {
        let mut entries: Vec<PortfolioEntry> = self
            .portfolio()
            .filter(|p| statuses.contains(&p.status))
            .map(|p| PortfolioEntry {
                id: p.id,
                slug: p.slug.clone(),
                title: p.title.clone(),
                status: p.status,
                created_at: p.created_at,
                modified_at: p.modified_at,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.modified_at
                .cmp(&a.modified_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        entries.truncate(usize::try_from(limit).unwrap_or(0));
        entries
    }

    async fn count_portfolio(&self, status: PostStatus) -> i64 {
        self.portfolio().filter(|p| p.status == status).count() as i64
    }

    async fn count_portfolio_with_project_status(
        &self,
        status: PostStatus,
        project_status: &str,
    ) -> i64 {
        self.portfolio()
            .filter(|p| p.status == status)
            .filter(|p| self.project_status_of(p.id).as_deref() == Some(project_status))
            .count() as i64
    }

    async fn get_settings(&self) -> PortalSettings {
        *self.settings.read().await
    }

    async fn save_settings(&self, settings: PortalSettings) -> PortalSettings {
        *self.settings.write().await = settings;
        settings
    }
}
