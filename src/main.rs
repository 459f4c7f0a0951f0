// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing, to stderr so stdout stays clean for --json)
// 3. Dispatch to the appropriate subcommand handler
// 4. Exit with proper code:
//    0 = success
//    1 = audit could not be saved / crawl found broken links
//    2 = usage error or unexpected error
//
// Rust concepts used:
// - async/await: network requests run on the tokio runtime
// - Result<T, E>: For error handling (T = success type, E = error type)
// - match: Pattern matching to handle different subcommands
// =============================================================================

// Module declarations - tells Rust about our other source files
mod audit;       // src/audit/ - pipeline, raw record, persisted document
mod backlog;     // src/backlog.rs - prioritized fixes
mod classify;    // src/classify.rs - SEO heuristics over a crawl
mod cli;         // src/cli.rs - command-line parsing
mod collectors;  // src/collectors/ - one module per signal
mod config;      // src/config.rs - scoring thresholds
mod crawl;       // src/crawl/ - the SEO crawler
mod fetch;       // src/fetch/ - the shared HTTP client
mod report;      // src/report/ - HTML rendering
mod scoring;     // src/scoring.rs - chapter scores

use anyhow::{Context, Result};
use audit::{AuditOptions, AuditReport};
use clap::Parser;
use cli::{Cli, Commands};
use collectors::{CollectorSettings, RetryPolicy};
use crawl::{CrawlOptions, CrawlResult};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // clap exits with code 2 on usage errors (e.g. a missing URL)
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{e:#}");
            error!(error = %message, "unexpected error");
            eprintln!("Error: {}", message);
            2
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG wins over --log-level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Audit {
            site_url,
            thresholds,
            out_dir,
            partials,
            css,
            max_pages,
            link_checks,
            psi_api_key,
            uptime_token,
            search_token,
            search_property,
            chrome,
            no_browser,
        } => {
            let options = AuditOptions {
                site_url,
                thresholds_path: thresholds,
                out_dir,
                partials_dir: partials,
                css: load_css(css.as_deref())?,
                crawl: CrawlOptions {
                    max_pages,
                    per_page_link_checks: link_checks,
                    ..Default::default()
                },
                settings: CollectorSettings {
                    pagespeed_api_key: psi_api_key,
                    uptime_token,
                    search_token,
                    search_property,
                    use_browser: !no_browser,
                    chrome_path: chrome,
                    ..Default::default()
                },
                pagespeed_retry: RetryPolicy::pagespeed(),
            };
            handle_audit(&options).await
        }
        Commands::Crawl {
            site_url,
            max_pages,
            link_checks,
            json,
        } => {
            let options = CrawlOptions {
                max_pages,
                per_page_link_checks: link_checks,
                ..Default::default()
            };
            handle_crawl(&site_url, &options, json).await
        }
        Commands::Report { results, css, out } => handle_report(&results, css.as_deref(), out),
    }
}

// Handles the 'audit' subcommand
async fn handle_audit(options: &AuditOptions) -> Result<i32> {
    if let Err(e) = audit::validate_site_url(&options.site_url) {
        eprintln!("Error: {:#}", e);
        eprintln!("Usage: site-audit audit https://example.com");
        return Ok(2);
    }

    match audit::run_audit(options).await {
        Ok(outcome) => {
            println!();
            print_scores(&outcome.report);
            println!("📋 Backlog items: {}", outcome.report.backlog.len());
            println!("✅ Done: {}", outcome.json_path.display());
            println!("📄 Report: {}", outcome.html_path.display());
            Ok(0)
        }
        Err(e) => {
            // Nothing useful was saved
            let message = format!("{e:#}");
            error!(error = %message, "audit failed");
            eprintln!("❌ Scoring/saving failed: {}", message);
            Ok(1)
        }
    }
}

// Handles the 'crawl' subcommand
async fn handle_crawl(site_url: &str, options: &CrawlOptions, json: bool) -> Result<i32> {
    if let Err(e) = audit::validate_site_url(site_url) {
        eprintln!("Error: {:#}", e);
        return Ok(2);
    }

    let fetcher = fetch::Fetcher::new()?;
    if !json {
        println!("🔍 Crawling website: {}", site_url);
        println!("📊 Max pages: {}, link checks per page: {}", options.max_pages, options.per_page_link_checks);
    }

    let result = crawl::crawl_site(&fetcher, site_url, options).await;

    if json {
        let seo = classify::classify(&result);
        let output = serde_json::json!({ "crawl": &result, "seo": seo });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_crawl_table(&result);
    }

    if result.broken_links.is_empty() {
        Ok(0) // Exit code 0 = all good
    } else {
        Ok(1) // Exit code 1 = broken links found
    }
}

// Handles the 'report' subcommand
fn handle_report(results: &Path, css: Option<&Path>, out: Option<PathBuf>) -> Result<i32> {
    let report = AuditReport::load(results)?;
    let css = load_css(css)?;
    let out = out.unwrap_or_else(|| audit::html_path_for(results));

    std::fs::write(&out, report::render_html(&report, &css))
        .with_context(|| format!("Failed to write {}", out.display()))?;
    println!("📄 Report: {}", out.display());
    Ok(0)
}

fn load_css(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read stylesheet {}", path.display())),
        None => Ok(report::DEFAULT_CSS.to_string()),
    }
}

fn print_scores(report: &AuditReport) {
    println!("{:<12} {:<7} {:<8}", "CHAPTER", "SCORE", "COLOR");
    println!("{}", "=".repeat(29));
    for (label, entry) in report.scores.chapters() {
        println!("{:<12} {:<7} {} {}", label, format!("{}/10", entry.score), color_icon(entry.color), entry.color);
    }
    println!();
}

fn color_icon(color: scoring::Color) -> &'static str {
    match color {
        scoring::Color::Green => "🟢",
        scoring::Color::Orange => "🟠",
        scoring::Color::Red => "🔴",
    }
}

// Prints the crawl as a human-readable table in the terminal
fn print_crawl_table(result: &CrawlResult) {
    println!("{:<60} {:<6} {:<6} {:<4}", "URL", "TITLE", "META", "H1");
    println!("{}", "=".repeat(79));

    for page in &result.pages {
        // Truncate URL if too long for display
        let url_display = if page.url.chars().count() > 57 {
            format!("{}...", page.url.chars().take(57).collect::<String>())
        } else {
            page.url.clone()
        };
        let title = if page.title.is_empty() { "❌" } else { "✅" };
        let meta = if page.meta_description_present { "✅" } else { "❌" };

        println!("{:<60} {:<6} {:<6} {:<4}", url_display, title, meta, page.h1_count);
    }
    println!();

    if !result.broken_links.is_empty() {
        println!("❌ Broken links:");
        for link in &result.broken_links {
            println!("   {}", link);
        }
        println!();
    }
    if !result.duplicate_titles.is_empty() {
        println!("🔁 Duplicate titles:");
        for title in &result.duplicate_titles {
            println!("   {}", title);
        }
        println!();
    }

    println!("📊 Summary:");
    println!("   📄 Pages: {}", result.crawled_pages);
    println!("   🏷️  Missing titles: {}", result.missing_titles);
    println!("   📝 Missing meta descriptions: {}", result.missing_metas);
    println!("   🔢 Pages without exactly one h1: {}", result.many_h1_issues);
    println!("   ❌ Broken links: {}", result.broken_links.len());
    println!("   💯 Health score: {}/10", result.health_score);
}
