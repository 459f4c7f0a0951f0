// src/audit/mod.rs
// =============================================================================
// One audit of one site, from collectors to files on disk.
//
// Submodules:
// - data: the raw record and how partial records merge into it
// - output: the persisted document (record + scores + backlog) and file names
// - pipeline: runs the collectors and writes the results
// =============================================================================

mod data;
mod output;
mod pipeline;

pub use data::AuditData;
pub use output::{html_path_for, AuditReport};
pub use pipeline::{run_audit, validate_site_url, AuditOptions};
