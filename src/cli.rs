// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Three subcommands:
// - audit: the full pipeline (collectors, scores, backlog, JSON + HTML)
// - crawl: only the SEO crawl, printed as a table or JSON
// - report: render HTML from a results file written earlier
//
// API tokens can come from flags or from the environment, so they don't
// have to appear in shell history.
//
// Rust concepts:
// - Derive macros: Parser/Subcommand generate the parsing code
// - Option<T>: flags that may be absent
// - PathBuf: an owned file system path
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

// This struct represents our entire CLI application
#[derive(Parser, Debug)]
#[command(
    name = "site-audit",
    version,
    about = "Audit a website: performance, security, legal, usability and SEO",
    long_about = "site-audit crawls a website, runs a set of collectors (PageSpeed, security headers, \
                  accessibility, structured data, search trend, uptime, cookies) and turns the results \
                  into chapter scores, a prioritized backlog and a static HTML report."
)]
pub struct Cli {
    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full audit and write results_<domain>_<date>.json plus an HTML report
    ///
    /// Example: site-audit audit https://example.com --out-dir dist
    Audit {
        /// Website URL to audit (e.g., https://example.com)
        site_url: String,

        /// Scoring thresholds (YAML); missing keys fall back to defaults
        #[arg(long, default_value = "audit/thresholds.yaml")]
        thresholds: PathBuf,

        /// Directory for the JSON and HTML output
        #[arg(long, default_value = "dist")]
        out_dir: PathBuf,

        /// Directory with partial *.json results merged over the live ones
        #[arg(long)]
        partials: Option<PathBuf>,

        /// Stylesheet for the HTML report (default: built-in)
        #[arg(long)]
        css: Option<PathBuf>,

        /// Maximum number of pages the SEO crawl visits
        #[arg(long, default_value_t = 50)]
        max_pages: usize,

        /// Maximum number of links probed per crawled page
        #[arg(long, default_value_t = 20)]
        link_checks: usize,

        /// PageSpeed Insights API key
        #[arg(long, env = "PSI_API_KEY", hide_env_values = true)]
        psi_api_key: Option<String>,

        /// Better Uptime API token
        #[arg(long, env = "BETTERUPTIME_API_TOKEN", hide_env_values = true)]
        uptime_token: Option<String>,

        /// Search Console OAuth access token
        #[arg(long, env = "GSC_ACCESS_TOKEN", hide_env_values = true)]
        search_token: Option<String>,

        /// Search Console property (e.g., sc-domain:example.com)
        #[arg(long, env = "GSC_SITE_URL")]
        search_property: Option<String>,

        /// Chromium binary for the cookie and accessibility scans
        #[arg(long, env = "CHROME_PATH")]
        chrome: Option<PathBuf>,

        /// Skip headless Chromium and scan the served HTML only
        #[arg(long)]
        no_browser: bool,
    },

    /// Crawl a website and report SEO issues and broken links
    ///
    /// Exits with code 1 when broken links were found.
    /// Example: site-audit crawl https://example.com --max-pages 100
    Crawl {
        /// Website URL to crawl (e.g., https://example.com)
        site_url: String,

        /// Maximum number of pages to visit
        #[arg(long, default_value_t = 50)]
        max_pages: usize,

        /// Maximum number of links probed per page
        #[arg(long, default_value_t = 20)]
        link_checks: usize,

        /// Output results in JSON format instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Render the HTML report for a results file
    ///
    /// Example: site-audit report dist/results_example_com_20260101-1200.json
    Report {
        /// Results JSON written by `audit`
        results: PathBuf,

        /// Stylesheet for the HTML report (default: built-in)
        #[arg(long)]
        css: Option<PathBuf>,

        /// Where to write the HTML (default: next to the JSON)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}


// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why `env = "..."` on the token flags?
//    - clap reads the environment variable when the flag is absent
//    - hide_env_values keeps the secret out of --help output
//    - needs clap's "env" feature (see Cargo.toml)
//
// 2. Why is --log-level global?
//    - global = true lets it appear before or after the subcommand
//    - RUST_LOG still wins when it is set (see main.rs)
// -----------------------------------------------------------------------------
