use std::sync::Arc;

use serde::Serialize;
use tera::{Context, Tera};

use crate::error::PortalError;

pub const LOGIN: &str = "login.html";
pub const PAGE: &str = "page.html";
pub const WIDGET_LINKS: &str = "widgets/links.html";
pub const WIDGET_DRAFTS: &str = "widgets/drafts.html";
pub const WIDGET_RECENT: &str = "widgets/recent.html";
pub const WIDGET_STATS: &str = "widgets/stats.html";

/// Templates
///
/// The embedded [`tera`](tera::Tera) templates. Every name ends in `.html`,
/// so autoescaping applies to all interpolated values.
#[derive(Clone)]
pub struct Templates {
    tera: Arc<Tera>,
}

impl Templates {
    pub fn load() -> Result<Self, PortalError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (LOGIN, include_str!("../templates/login.html")),
            (PAGE, include_str!("../templates/page.html")),
            (WIDGET_LINKS, include_str!("../templates/widgets/links.html")),
            (WIDGET_DRAFTS, include_str!("../templates/widgets/drafts.html")),
            (WIDGET_RECENT, include_str!("../templates/widgets/recent.html")),
            (WIDGET_STATS, include_str!("../templates/widgets/stats.html")),
        ])?;
        tera.set_escape_fn(escape_html);
        Ok(Self {
            tera: Arc::new(tera),
        })
    }

    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String, PortalError> {
        let context = Context::from_serialize(context)?;
        Ok(self.tera.render(name, &context)?)
    }
}

/// Attribute-safe escaping that leaves `/` alone so URLs stay readable.
fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(c),
        }
    }
    output
}
