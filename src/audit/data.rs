// src/audit/data.rs
// =============================================================================
// The raw audit record: everything the collectors produced for one site.
//
// Each collector has its own typed slot. Anything else (hand-written notes,
// output of external scripts) lives in `extra`, which is flattened into
// the JSON document so those sections keep their own top-level keys.
//
// Merging a partial record into this one:
// - collector slots, site and audit date: a present value replaces
// - notes: concatenated
// - extra sections: key union, nested objects merged recursively, arrays
//   concatenated, other values replaced
// - `scores` and `backlog` are computed here and never taken from a partial
//
// Rust concepts:
// - #[serde(flatten)]: unknown top-level keys land in a map instead of
//   being dropped
// - Option<T> per collector: "not run" is different from "ran and failed"
// =============================================================================

use crate::classify::SeoAudit;
use crate::collectors::a11y::A11yReport;
use crate::collectors::cookies::CookieScan;
use crate::collectors::headers::HeaderReport;
use crate::collectors::pagespeed::PageSpeed;
use crate::collectors::search_trend::SearchTrend;
use crate::collectors::structured_data::StructuredData;
use crate::collectors::uptime::UptimeStatus;
use crate::collectors::Collected;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// Top-level keys owned by the scoring step
pub const RESERVED_KEYS: [&str; 2] = ["scores", "backlog"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub url: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuditData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<SiteInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagespeed: Option<Collected<PageSpeed>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Collected<HeaderReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a11y: Option<Collected<A11yReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<Collected<StructuredData>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_trend: Option<Collected<SearchTrend>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<Collected<UptimeStatus>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Collected<CookieScan>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo: Option<Collected<SeoAudit>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl AuditData {
    pub fn new(url: &str, name: &str, audit_date: String) -> Self {
        Self {
            site: Some(SiteInfo {
                url: url.to_string(),
                name: name.to_string(),
            }),
            audit_date: Some(audit_date),
            ..Default::default()
        }
    }

    pub fn site_url(&self) -> &str {
        self.site.as_ref().map(|s| s.url.as_str()).unwrap_or_default()
    }

    pub fn site_name(&self) -> &str {
        self.site.as_ref().map(|s| s.name.as_str()).unwrap_or_default()
    }

    // Merges `other` into self; see the rules at the top of this file
    pub fn merge(&mut self, other: AuditData) {
        replace_if_present(&mut self.site, other.site);
        replace_if_present(&mut self.audit_date, other.audit_date);
        replace_if_present(&mut self.pagespeed, other.pagespeed);
        replace_if_present(&mut self.headers, other.headers);
        replace_if_present(&mut self.a11y, other.a11y);
        replace_if_present(&mut self.structured_data, other.structured_data);
        replace_if_present(&mut self.search_trend, other.search_trend);
        replace_if_present(&mut self.uptime, other.uptime);
        replace_if_present(&mut self.cookies, other.cookies);
        replace_if_present(&mut self.seo, other.seo);

        self.notes.extend(other.notes);

        for (key, value) in other.extra {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            match self.extra.get_mut(&key) {
                Some(existing) => merge_value(existing, value),
                None => {
                    self.extra.insert(key, value);
                }
            }
        }
    }

    // Drops keys that must not come from outside the scoring step
    pub fn strip_reserved(&mut self) {
        for key in RESERVED_KEYS {
            self.extra.remove(key);
        }
    }
}

fn replace_if_present<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

// Merges two free-form JSON values in place
pub fn merge_value(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (_, Value::Null) => {}
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => merge_value(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(existing), Value::Array(incoming)) => existing.extend(incoming),
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::CollectedExt;
    use serde_json::json;

    #[test]
    fn test_unknown_sections_are_kept() {
        let data: AuditData = serde_json::from_value(json!({
            "site": { "url": "https://jansen.nl", "name": "Bakkerij Jansen" },
            "headers": { "missing": ["content-security-policy"], "ipv6": true },
            "uptime": { "error": "Missing BETTERUPTIME_API_TOKEN" },
            "wordpress": { "version": "6.5" }
        }))
        .unwrap();

        assert_eq!(data.site_name(), "Bakkerij Jansen");
        assert!(data.headers.record().unwrap().is_missing("content-security-policy"));
        assert!(data.uptime.errored());
        assert_eq!(data.extra["wordpress"], json!({ "version": "6.5" }));

        let back = serde_json::to_value(&data).unwrap();
        assert_eq!(back["wordpress"]["version"], "6.5");
        assert!(back.get("pagespeed").is_none());
    }

    #[test]
    fn test_merge_replaces_collector_records() {
        let mut live = AuditData::new("https://jansen.nl", "Jansen", "2026-10-18".into());
        live.uptime = Some(Collected::failed("Missing BETTERUPTIME_API_TOKEN"));
        live.a11y = Some(Collected::failed("timeout"));

        let partial: AuditData = serde_json::from_value(json!({
            "uptime": { "id": "7", "status": "up" }
        }))
        .unwrap();
        live.merge(partial);

        assert_eq!(live.uptime.record().unwrap().status.as_deref(), Some("up"));
        // Absent in the partial, so untouched
        assert!(live.a11y.errored());
        assert_eq!(live.site_url(), "https://jansen.nl");
    }

    #[test]
    fn test_merge_concatenates_and_unions() {
        let mut live: AuditData = serde_json::from_value(json!({
            "notes": ["first"],
            "wordpress": { "plugins": ["yoast"], "core": { "version": "6.4" } }
        }))
        .unwrap();
        let partial: AuditData = serde_json::from_value(json!({
            "notes": ["second"],
            "wordpress": { "plugins": ["wpforms"], "core": { "version": "6.5", "updates": 2 } },
            "ux": { "score": 6 }
        }))
        .unwrap();
        live.merge(partial);

        assert_eq!(live.notes, vec!["first", "second"]);
        assert_eq!(
            live.extra["wordpress"],
            json!({ "plugins": ["yoast", "wpforms"], "core": { "version": "6.5", "updates": 2 } })
        );
        assert_eq!(live.extra["ux"], json!({ "score": 6 }));
    }

    #[test]
    fn test_merge_never_takes_reserved_keys() {
        let mut live = AuditData::default();
        let partial: AuditData = serde_json::from_value(json!({
            "scores": { "legal": { "score": 10, "color": "green" } },
            "backlog": []
        }))
        .unwrap();
        live.merge(partial);
        assert!(live.extra.is_empty());
    }

    #[test]
    fn test_merge_value_null_keeps_existing() {
        let mut target = json!({ "a": 1 });
        merge_value(&mut target, json!({ "a": null, "b": "x" }));
        assert_eq!(target, json!({ "a": 1, "b": "x" }));

        let mut scalar = json!(1);
        merge_value(&mut scalar, json!("two"));
        assert_eq!(scalar, json!("two"));
    }
}
