// src/fetch/mod.rs
// =============================================================================
// This module owns every request the auditor makes.
//
// Submodules:
// - http: the shared client, page fetches, link probes and error categories
// - browser: headless Chromium for collectors that need a rendered page
//
// Everything else (crawler, collectors) goes through the Fetcher or a
// BrowserSession so timeouts, redirect limits and the user agent are
// configured in one place.
// =============================================================================

mod browser;
mod http;

pub use browser::{BrowserSession, RenderedCookie, RenderedPage};
pub use http::{Fetcher, ProbeOutcome};
