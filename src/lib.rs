//! Per-site selection statistics from codeml site-model reports.
//!
//! Parsing lives in the `rst-reader` package; this crate loads reports from
//! disk, aggregates bootstrap replicates and exports the results.

pub mod about;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod report;

pub use rst_reader::{ModelId, ModelResult, ReportResults, SiteRecord, SINGLE_MODEL_ID};
