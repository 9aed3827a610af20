//! Read-only dashboard widgets over `bbab_portfolio` entries.
//!
//! Each widget is a query step followed by a pure formatter. Formatters take
//! `None` when the portfolio content type is not registered and then emit the
//! fixed "not active" card.

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use crate::{
    config::SiteConfig,
    error::PortalError,
    models::{PORTFOLIO_BASE, PORTFOLIO_TYPE, PortfolioEntry, PostStatus},
    repository::RepositoryState,
    templates::{self, Templates},
};

pub const DRAFTS_LIMIT: i64 = 10;
pub const RECENT_LIMIT: i64 = 5;
pub const RECENT_STATUSES: [PostStatus; 3] =
    [PostStatus::Publish, PostStatus::Draft, PostStatus::Pending];
pub const LAST_UPDATED_STATUSES: [PostStatus; 2] = [PostStatus::Publish, PostStatus::Draft];

/// Project status meta values counted by the stats widget, with their labels.
pub const PROJECT_STATUSES: [(&str, &str); 3] = [
    ("live", "Live"),
    ("completed_offline", "Offline"),
    ("development_only", "Dev Only"),
];

/// Common start of every widget placeholder.
const TAG_PREFIX: &str = "[portal_";

const UNTITLED: &str = "(Untitled)";
const NEVER: &str = "Never";
const DATE_FORMAT: &str = "%b %-d, %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    Links,
    Drafts,
    Recent,
    Stats,
}

impl Widget {
    pub const ALL: [Widget; 4] = [Widget::Links, Widget::Drafts, Widget::Recent, Widget::Stats];

    /// Content placeholder name, written in page content as `[name]`.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Widget::Links => "portal_links",
            Widget::Drafts => "portal_drafts",
            Widget::Recent => "portal_recent",
            Widget::Stats => "portal_stats",
        }
    }

    fn card(&self) -> &'static str {
        match self {
            Widget::Links => "links",
            Widget::Drafts => "drafts",
            Widget::Recent => "recent",
            Widget::Stats => "stats",
        }
    }

    fn tag(&self) -> String {
        format!("[{}]", self.placeholder())
    }
}

/// The card emitted when the portfolio content type is unavailable.
pub fn unavailable(widget: Widget) -> String {
    format!(
        r#"<div class="bbab-portal-card bbab-portal-{}"><p>Portfolio plugin not active.</p></div>"#,
        widget.card()
    )
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn display_title(title: &str) -> &str {
    if title.trim().is_empty() { UNTITLED } else { title }
}

/// The fixed quick-link table.
pub fn quick_links(site: &SiteConfig) -> Vec<(&'static str, String)> {
    vec![
        ("Add Portfolio", site.home("/brads-portal/add-portfolio/")),
        ("All Portfolio", site.admin(&format!("edit.php?post_type={}", PORTFOLIO_TYPE))),
        ("GitHub", "https://github.com/Brads-Bits-and-Bytes".to_string()),
        ("SiteGround", "https://my.siteground.com".to_string()),
        ("Google Analytics", "https://analytics.google.com".to_string()),
        ("WP Admin", site.admin_url.clone()),
    ]
}

/// A link is external when its host differs from the site's host.
/// URLs without a host are relative and therefore internal.
pub fn is_external(url: &str, site_host: Option<&str>) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.host_str() != site_host,
        Err(_) => false,
    }
}

#[derive(Serialize)]
struct LinkView<'a> {
    label: &'a str,
    url: &'a str,
    external: bool,
}

pub fn format_links(
    templates: &Templates,
    site: &SiteConfig,
    links: &[(&str, String)],
) -> Result<String, PortalError> {
    let host = site.host();
    let links: Vec<LinkView> = links
        .iter()
        .map(|(label, url)| LinkView {
            label,
            url,
            external: is_external(url, host.as_deref()),
        })
        .collect();
    templates.render(
        templates::WIDGET_LINKS,
        &serde_json::json!({ "links": links }),
    )
}

#[derive(Serialize)]
struct DraftView<'a> {
    title: &'a str,
    date: String,
    edit_url: String,
}

pub fn format_drafts(
    templates: &Templates,
    site: &SiteConfig,
    drafts: Option<&[PortfolioEntry]>,
) -> Result<String, PortalError> {
    let Some(drafts) = drafts else {
        return Ok(unavailable(Widget::Drafts));
    };
    let drafts: Vec<DraftView> = drafts
        .iter()
        .map(|entry| DraftView {
            title: display_title(&entry.title),
            date: format_date(&entry.created_at),
            edit_url: site.edit_link(entry.id),
        })
        .collect();
    templates.render(
        templates::WIDGET_DRAFTS,
        &serde_json::json!({ "drafts": drafts }),
    )
}

#[derive(Serialize)]
struct RecentView<'a> {
    title: &'a str,
    status: &'static str,
    published: bool,
    date: String,
    edit_url: String,
    view_url: Option<String>,
}

pub fn format_recent(
    templates: &Templates,
    site: &SiteConfig,
    entries: Option<&[PortfolioEntry]>,
) -> Result<String, PortalError> {
    let Some(entries) = entries else {
        return Ok(unavailable(Widget::Recent));
    };
    let entries: Vec<RecentView> = entries
        .iter()
        .map(|entry| {
            let published = entry.status == PostStatus::Publish;
            RecentView {
                title: display_title(&entry.title),
                status: entry.status.as_str(),
                published,
                date: format_date(&entry.modified_at),
                edit_url: site.edit_link(entry.id),
                view_url: published
                    .then(|| site.home(&format!("/{}/{}/", PORTFOLIO_BASE, entry.slug))),
            }
        })
        .collect();
    templates.render(
        templates::WIDGET_RECENT,
        &serde_json::json!({ "entries": entries }),
    )
}

/// PortfolioStats
///
/// Everything the stats card shows, gathered before formatting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioStats {
    pub published: i64,
    pub drafts: i64,
    /// `(label, count)` in the order of [`PROJECT_STATUSES`].
    pub breakdown: Vec<(String, i64)>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl PortfolioStats {
    pub fn total(&self) -> i64 {
        self.published + self.drafts
    }
}

#[derive(Serialize)]
struct BreakdownRow<'a> {
    label: &'a str,
    count: i64,
}

pub fn format_stats(
    templates: &Templates,
    stats: Option<&PortfolioStats>,
) -> Result<String, PortalError> {
    let Some(stats) = stats else {
        return Ok(unavailable(Widget::Stats));
    };
    let breakdown: Vec<BreakdownRow> = stats
        .breakdown
        .iter()
        .map(|(label, count)| BreakdownRow {
            label,
            count: *count,
        })
        .collect();
    let last_updated = stats
        .last_modified
        .as_ref()
        .map(format_date)
        .unwrap_or_else(|| NEVER.to_string());
    templates.render(
        templates::WIDGET_STATS,
        &serde_json::json!({
            "total": stats.total(),
            "published": stats.published,
            "drafts": stats.drafts,
            "breakdown": breakdown,
            "last_updated": last_updated,
        }),
    )
}

/// Dashboard
///
/// Runs the widget queries against the injected repository and formats them.
#[derive(Clone)]
pub struct Dashboard {
    repo: RepositoryState,
    site: SiteConfig,
    templates: Templates,
}

impl Dashboard {
    pub fn new(repo: RepositoryState, site: SiteConfig, templates: Templates) -> Self {
        Self {
            repo,
            site,
            templates,
        }
    }

    async fn portfolio_available(&self) -> bool {
        self.repo.post_type_exists(PORTFOLIO_TYPE).await
    }

    pub async fn render(&self, widget: Widget) -> Result<String, PortalError> {
        match widget {
            Widget::Links => format_links(&self.templates, &self.site, &quick_links(&self.site)),
            Widget::Drafts => {
                let drafts = if self.portfolio_available().await {
                    Some(self.repo.list_portfolio(&[PostStatus::Draft], DRAFTS_LIMIT).await)
                } else {
                    None
                };
                format_drafts(&self.templates, &self.site, drafts.as_deref())
            }
            Widget::Recent => {
                let recent = if self.portfolio_available().await {
                    Some(self.repo.list_portfolio(&RECENT_STATUSES, RECENT_LIMIT).await)
                } else {
                    None
                };
                format_recent(&self.templates, &self.site, recent.as_deref())
            }
            Widget::Stats => {
                let stats = if self.portfolio_available().await {
                    Some(self.stats().await)
                } else {
                    None
                };
                format_stats(&self.templates, stats.as_ref())
            }
        }
    }

    /// Gathers the stats card's counts. Only published entries are broken down
    /// by project status.
    pub async fn stats(&self) -> PortfolioStats {
        let published = self.repo.count_portfolio(PostStatus::Publish).await;
        let drafts = self.repo.count_portfolio(PostStatus::Draft).await;

        let mut breakdown = Vec::with_capacity(PROJECT_STATUSES.len());
        for (value, label) in PROJECT_STATUSES {
            let count = self
                .repo
                .count_portfolio_with_project_status(PostStatus::Publish, value)
                .await;
            breakdown.push((label.to_string(), count));
        }

        let last_modified = self
            .repo
            .list_portfolio(&LAST_UPDATED_STATUSES, 1)
            .await
            .first()
            .map(|entry| entry.modified_at);

        PortfolioStats {
            published,
            drafts,
            breakdown,
            last_modified,
        }
    }

    /// Replaces every `[portal_*]` placeholder in `content` with its widget.
    /// Widgets whose placeholder is absent are never queried. Fragments are
    /// copied into the output as-is and never scanned for placeholders again.
    pub async fn expand_placeholders(&self, content: &str) -> String {
        let mut fragments = Vec::new();
        for widget in Widget::ALL {
            if !content.contains(&widget.tag()) {
                continue;
            }
            let fragment = self.render(widget).await.unwrap_or_else(|e| {
                tracing::error!(widget = widget.placeholder(), "widget failed to render: {}", e);
                String::new()
            });
            fragments.push((widget.tag(), fragment));
        }
        splice_fragments(content, &fragments)
    }
}

/// Single left-to-right pass over `content`, substituting each known tag.
fn splice_fragments(content: &str, fragments: &[(String, String)]) -> String {
    let mut output = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(start) = rest.find(TAG_PREFIX) {
        output.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match fragments
            .iter()
            .find(|(tag, _)| candidate.starts_with(tag.as_str()))
        {
            Some((tag, fragment)) => {
                output.push_str(fragment);
                rest = &candidate[tag.len()..];
            }
            None => {
                output.push_str(TAG_PREFIX);
                rest = &candidate[TAG_PREFIX.len()..];
            }
        }
    }
    output.push_str(rest);
    output
}
