// src/collectors/a11y.rs
// =============================================================================
// Accessibility (WCAG 2.1 AA) checks that can be decided from the DOM.
//
// The DOM comes from headless Chromium when one is available, so markup
// added by JavaScript is checked too; otherwise from the server's HTML.
// Contrast and focus order stay out of reach. What we do check is what
// axe and pa11y flag most often on small business sites:
//
//   error   document-title     no <title>
//   error   html-has-lang      <html> without a lang attribute
//   error   image-alt          <img> without alt
//   error   label              form field without label / aria-label
//   error   link-name          <a href> without text or aria-label
//   error   button-name        <button> without text or aria-label
//   warning heading-order      heading level jumps (h2 -> h4)
//   notice  landmark-one-main  no <main> landmark
// =============================================================================

use super::{render, CollectorSettings, ScanMethod};
use crate::fetch::Fetcher;
use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

static TITLE: LazyLock<Selector> = LazyLock::new(|| sel("title"));
static HTML: LazyLock<Selector> = LazyLock::new(|| sel("html"));
static IMG: LazyLock<Selector> = LazyLock::new(|| sel("img"));
static IMG_WITH_ALT: LazyLock<Selector> = LazyLock::new(|| sel("img[alt]"));
static LABEL_FOR: LazyLock<Selector> = LazyLock::new(|| sel("label[for]"));
static FORM_FIELD: LazyLock<Selector> = LazyLock::new(|| sel("input, select, textarea"));
static LINK: LazyLock<Selector> = LazyLock::new(|| sel("a[href]"));
static BUTTON: LazyLock<Selector> = LazyLock::new(|| sel("button"));
static HEADING: LazyLock<Selector> = LazyLock::new(|| sel("h1, h2, h3, h4, h5, h6"));
static MAIN: LazyLock<Selector> = LazyLock::new(|| sel(r#"main, [role="main"]"#));

const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Error,
    Warning,
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct A11yIssue {
    #[serde(rename = "type")]
    pub kind: IssueType,
    pub code: String,
    pub message: String,
    pub selector: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Severities {
    pub error: usize,
    pub warning: usize,
    pub notice: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct A11yReport {
    pub total: usize,
    pub severities: Severities,
    pub issues: Vec<A11yIssue>,
    #[serde(default)]
    pub method: ScanMethod,
}

pub async fn collect(fetcher: &Fetcher, settings: &CollectorSettings, url: &str) -> Result<A11yReport> {
    if let Some(rendered) = render(settings, url, TIMEOUT).await {
        let mut report = check_html(&rendered?.html);
        report.method = ScanMethod::Browser;
        return Ok(report);
    }

    let page = fetcher.get(url, TIMEOUT).await?;
    if page.is_error_status() {
        return Err(anyhow!("HTTP {}", page.status));
    }
    Ok(check_html(&page.body))
}

pub fn check_html(html: &str) -> A11yReport {
    let document = Html::parse_document(html);
    let mut issues = Vec::new();

    let mut push = |kind, code: &str, message: &str, selector: String| {
        issues.push(A11yIssue {
            kind,
            code: code.to_string(),
            message: message.to_string(),
            selector,
        });
    };

    if document.select(&TITLE).next().is_none() {
        push(IssueType::Error, "document-title", "Document does not have a <title> element", "html".into());
    }

    let has_lang = document
        .select(&HTML)
        .next()
        .and_then(|html| html.value().attr("lang"))
        .is_some_and(|lang| !lang.trim().is_empty());
    if !has_lang {
        push(IssueType::Error, "html-has-lang", "<html> element does not have a lang attribute", "html".into());
    }

    for img in document.select(&IMG) {
        if img.value().attr("alt").is_none() && img.value().attr("role") != Some("presentation") {
            push(IssueType::Error, "image-alt", "Image does not have an alt attribute", describe(&img));
        }
    }

    let labelled_ids: HashSet<&str> = document
        .select(&LABEL_FOR)
        .filter_map(|label| label.value().attr("for"))
        .collect();
    for field in document.select(&FORM_FIELD) {
        let input_type = field.value().attr("type").unwrap_or("text").to_ascii_lowercase();
        if matches!(input_type.as_str(), "hidden" | "submit" | "button" | "reset" | "image") {
            continue;
        }
        let by_id = field.value().attr("id").is_some_and(|id| labelled_ids.contains(id));
        let wrapped = field
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| a.value().name() == "label");
        if !by_id && !wrapped && !has_aria_name(&field) && field.value().attr("title").is_none() {
            push(IssueType::Error, "label", "Form field does not have a label", describe(&field));
        }
    }

    for link in document.select(&LINK) {
        if !has_accessible_text(&link) {
            push(IssueType::Error, "link-name", "Link does not have discernible text", describe(&link));
        }
    }

    for button in document.select(&BUTTON) {
        if !has_accessible_text(&button) {
            push(IssueType::Error, "button-name", "Button does not have discernible text", describe(&button));
        }
    }

    let mut previous_level = 0u8;
    for heading in document.select(&HEADING) {
        let level = heading.value().name()[1..].parse::<u8>().unwrap_or(1);
        if previous_level > 0 && level > previous_level + 1 {
            push(
                IssueType::Warning,
                "heading-order",
                "Heading levels should only increase by one",
                describe(&heading),
            );
        }
        previous_level = level;
    }

    if document.select(&MAIN).next().is_none() {
        push(IssueType::Notice, "landmark-one-main", "Document does not have a main landmark", "html".into());
    }

    let severities = Severities {
        error: issues.iter().filter(|i| i.kind == IssueType::Error).count(),
        warning: issues.iter().filter(|i| i.kind == IssueType::Warning).count(),
        notice: issues.iter().filter(|i| i.kind == IssueType::Notice).count(),
    };

    A11yReport {
        total: issues.len(),
        severities,
        issues,
        method: ScanMethod::Static,
    }
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css:?}: {e}"))
}

fn has_aria_name(element: &ElementRef) -> bool {
    ["aria-label", "aria-labelledby"]
        .iter()
        .any(|attr| element.value().attr(attr).is_some_and(|v| !v.trim().is_empty()))
}

// Visible text, aria-label, or an image with alt text inside
fn has_accessible_text(element: &ElementRef) -> bool {
    if has_aria_name(element) || element.value().attr("title").is_some() {
        return true;
    }
    if element.text().any(|t| !t.trim().is_empty()) {
        return true;
    }
    element
        .select(&IMG_WITH_ALT)
        .any(|img| img.value().attr("alt").is_some_and(|alt| !alt.trim().is_empty()))
}

// A short CSS-ish path to the element, good enough to find it in the source
fn describe(element: &ElementRef) -> String {
    let value = element.value();
    let mut out = value.name().to_string();
    if let Some(id) = value.attr("id") {
        out.push('#');
        out.push_str(id);
    } else if let Some(class) = value.attr("class").and_then(|c| c.split_whitespace().next()) {
        out.push('.');
        out.push_str(class);
    }
    for attr in ["src", "href", "name"] {
        if let Some(v) = value.attr(attr) {
            out.push_str(&format!("[{}=\"{}\"]", attr, v));
            break;
        }
    }
    out
}
