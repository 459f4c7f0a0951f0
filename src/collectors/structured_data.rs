// src/collectors/structured_data.rs
// =============================================================================
// Detects JSON-LD structured data (schema.org) on the landing page.
//
// Blocks that do not parse as JSON are ignored, the same way search engines
// ignore them. We keep the first three items for the report and collect the
// @type of everything, including items nested in an itemListElement.
// =============================================================================

use crate::fetch::Fetcher;
use anyhow::{anyhow, Result};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;

static JSON_LD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).unwrap_or_else(|e| panic!("invalid built-in selector: {e}"))
});

const TIMEOUT: Duration = Duration::from_secs(20);
const KEPT_ITEMS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredData {
    pub found: bool,
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub types: Vec<String>,
}

pub async fn collect(fetcher: &Fetcher, url: &str) -> Result<StructuredData> {
    let page = fetcher.get(url, TIMEOUT).await?;
    if page.is_error_status() {
        return Err(anyhow!("HTTP {}", page.status));
    }
    Ok(extract(&page.body))
}

pub fn extract(html: &str) -> StructuredData {
    let document = Html::parse_document(html);

    let parsed: Vec<Value> = document
        .select(&JSON_LD)
        .filter_map(|script| serde_json::from_str(&script.text().collect::<String>()).ok())
        .collect();

    let mut types = Vec::new();
    for item in &parsed {
        collect_types(item, &mut types);
    }

    StructuredData {
        found: !parsed.is_empty(),
        items: parsed.into_iter().take(KEPT_ITEMS).collect(),
        types,
    }
}

fn collect_types(value: &Value, types: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_types(item, types)),
        Value::Object(map) => {
            match map.get("@type") {
                Some(Value::String(t)) => types.push(t.clone()),
                Some(Value::Array(ts)) => {
                    if let Some(Value::String(t)) = ts.first() {
                        types.push(t.clone());
                    }
                }
                _ => {}
            }
            if let Some(graph) = map.get("@graph") {
                collect_types(graph, types);
            }
            if let Some(list) = map.get("itemListElement") {
                collect_types(list, types);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_structured_data() {
        let data = extract("<html><body><script>var x = 1;</script></body></html>");
        assert!(!data.found);
        assert!(data.items.is_empty());
    }

    #[test]
    fn test_collects_items_and_types() {
        let html = r#"
            <script type="application/ld+json">{"@type": "Organization", "name": "Jansen"}</script>
            <script type="application/ld+json">{ not json }</script>
            <script type="application/ld+json">
              {"@type": "BreadcrumbList", "itemListElement": [{"@type": "ListItem"}, {"@type": "ListItem"}]}
            </script>
            <script type="application/ld+json">{"@graph": [{"@type": ["LocalBusiness", "Bakery"]}]}</script>
            <script type="application/ld+json">[{"@type": "WebSite"}]</script>
        "#;
        let data = extract(html);
        assert!(data.found);
        assert_eq!(data.items.len(), 3);
        assert_eq!(data.items[0]["name"], "Jansen");
        assert_eq!(
            data.types,
            vec!["Organization", "BreadcrumbList", "ListItem", "ListItem", "LocalBusiness", "WebSite"]
        );
    }
}
