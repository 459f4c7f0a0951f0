// src/crawl/page.rs
// =============================================================================
// Extracts the SEO signals from one HTML page.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// Only the first <title> and the first <meta name="description"> count,
// which is what search engines look at too.
// =============================================================================

use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static META_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[name="description"]"#));
static H1: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static OG_SITE_NAME: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[property="og:site_name"]"#));

// Our selectors are constants and known to be valid
fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e}"))
}

// Everything we learn from a single page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAnalysis {
    /// Trimmed <title> text, empty when missing
    pub title: String,
    /// Trimmed meta description, None when missing or blank
    pub meta_description: Option<String>,
    /// Number of <h1> elements
    pub h1_count: usize,
    /// Raw href values in document order
    pub hrefs: Vec<String>,
}

impl PageAnalysis {
    // Meta description length in characters (not bytes)
    pub fn meta_description_length(&self) -> usize {
        self.meta_description
            .as_deref()
            .map(|d| d.chars().count())
            .unwrap_or(0)
    }
}

pub fn analyze_page(html: &str) -> PageAnalysis {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let meta_description = document
        .select(&META_DESCRIPTION)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    let h1_count = document.select(&H1).count();

    let hrefs = document
        .select(&ANCHOR)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect();

    PageAnalysis {
        title,
        meta_description,
        h1_count,
        hrefs,
    }
}

// Picks a human readable name for the site.
//
// Order: <meta property="og:site_name">, then <title>, then the hostname
// without a leading "www.".
pub fn site_name(html: &str, site_url: &str) -> String {
    let document = Html::parse_document(html);

    let og = document
        .select(&OG_SITE_NAME)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(str::trim)
        .filter(|n| !n.is_empty());
    if let Some(name) = og {
        return name.to_string();
    }

    let title = analyze_page(html).title;
    if !title.is_empty() {
        return title;
    }

    match Url::parse(site_url) {
        Ok(url) => url
            .host_str()
            .map(|h| h.trim_start_matches("www.").to_string())
            .unwrap_or_else(|| site_url.to_string()),
        Err(_) => site_url.to_string(),
    }
}
