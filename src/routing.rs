use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{
    models::{ContentItem, PORTFOLIO_BASE, PORTFOLIO_TYPE, PortfolioEntry, PostStatus},
    repository::Repository,
};

/// Longest parent chain followed when building a page path.
const MAX_DEPTH: usize = 16;

/// RouteTable
///
/// Maps normalized front-end paths (`/brads-portal/add-portfolio/`) to page ids,
/// and `/portfolio/{slug}/` to published portfolio entries.
/// Written only by `refresh`; requests take a read lock to resolve.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Arc<RwLock<HashMap<String, i64>>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the table from the current set of routable pages and
    /// published portfolio entries. Returns the number of paths in the new table.
    pub async fn refresh(&self, repo: &dyn Repository) -> usize {
        let pages = repo.list_pages().await;
        let mut table = build_routes(&pages);
        if repo.post_type_exists(PORTFOLIO_TYPE).await {
            let entries = repo.list_portfolio(&[PostStatus::Publish], i64::MAX).await;
            add_portfolio_routes(&mut table, &entries);
        }
        let count = table.len();
        *self.routes.write().await = table;
        tracing::info!(routes = count, "route table refreshed");
        count
    }

    /// Lifecycle hook run when the portal is switched on.
    pub async fn activate(&self, repo: &dyn Repository) -> usize {
        self.refresh(repo).await
    }

    /// Lifecycle hook run when the portal is switched off.
    pub async fn deactivate(&self, repo: &dyn Repository) -> usize {
        self.refresh(repo).await
    }

    pub async fn resolve(&self, path: &str) -> Option<i64> {
        let key = normalize_path(path)?;
        self.routes.read().await.get(&key).copied()
    }
}

/// Normalizes a request path to `/a/b/` form. The site root has no page.
pub fn normalize_path(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return None;
    }
    Some(format!("/{}/", segments.join("/")))
}

fn build_routes(pages: &[ContentItem]) -> HashMap<String, i64> {
    let by_id: HashMap<i64, &ContentItem> = pages.iter().map(|p| (p.id, p)).collect();
    let mut routes = HashMap::with_capacity(pages.len());

    for page in pages {
        let mut slugs = vec![page.slug.as_str()];
        let mut parent_id = page.parent_id;
        let mut complete = true;
        while parent_id != 0 {
            // Orphans and cycles produce no route.
            match by_id.get(&parent_id) {
                Some(parent) if slugs.len() < MAX_DEPTH => {
                    slugs.push(parent.slug.as_str());
                    parent_id = parent.parent_id;
                }
                _ => {
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            tracing::warn!(page_id = page.id, "page has no routable ancestry");
            continue;
        }
        slugs.reverse();
        routes.insert(format!("/{}/", slugs.join("/")), page.id);
    }
    routes
}

/// Pages keep their path when a portfolio entry would collide with one.
fn add_portfolio_routes(routes: &mut HashMap<String, i64>, entries: &[PortfolioEntry]) {
    for entry in entries {
        routes
            .entry(format!("/{}/{}/", PORTFOLIO_BASE, entry.slug))
            .or_insert(entry.id);
    }
}
