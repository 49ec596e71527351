//! # diag-collector
//!
//! The execution core of a host diagnostic-data collection agent.
//!
//! ## Overview
//!
//! Given a declarative catalog of commands and files, diag-collector decides
//! which items actually run, applies the operator's exclusion rules, runs
//! the collection and assembles the results into a single archive,
//! optionally scrubbing hostnames, IP addresses and keywords first.
//!
//! ## Features
//!
//! - **Exclusion rules**: structured YAML or legacy INI remove file, with
//!   strict schema checks and a `0600` permission policy
//! - **Pre-command expansion**: helper commands generate arguments, guarded
//!   by a shell-aware command blacklist
//! - **Wildcards and globs**: file specs expand against the host or a
//!   mounted image
//! - **Packaging**: tar with gz, xz, bz2 or no compression
//! - **Obfuscation**: built-in report cleaner plus a derived facts file
//! - **Parallel mode**: several catalogs on a bounded worker pool
//!
//! ## Usage
//!
//! ```no_run
//! use diag_collector::archive::Archive;
//! use diag_collector::collectors::DataCollector;
//! use diag_collector::config::{BlacklistReport, ClientConfig, RemoveConfLoader};
//! use diag_collector::models::CollectionSpecs;
//! use diag_collector::obfuscate::ReportCleaner;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = ClientConfig::default();
//! let specs = CollectionSpecs::from_json_file(Path::new("catalog.json"))?;
//! let rm_conf = RemoveConfLoader::new(&config).get_rm_conf()?;
//! let report = BlacklistReport::from_conf(rm_conf.as_ref(), &config);
//!
//! let mut collector = DataCollector::new(config.clone(), Archive::new(&config)?);
//! collector.run_collection(&specs, rm_conf.as_ref(), &serde_json::json!({}), &report)?;
//!
//! if let Some(path) = collector.done(rm_conf.as_ref(), &mut ReportCleaner::new())? {
//!     println!("Archive: {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`models`]: Collection catalog structures
//! - [`config`]: Client configuration and the exclusion file loader
//! - [`specs`]: Data-source categorization report
//! - [`security`]: Pre-command blacklist
//! - [`collectors`]: Orchestration and single-item collectors
//! - [`archive`]: Working directory and package lifecycle
//! - [`obfuscate`]: Scrubbing engine boundary and built-in cleaner
//! - [`runner`]: Serial and parallel execution of several catalogs
//! - [`utils`]: Name mangling, path expansion, tags and hashing
//! - [`constants`]: Application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Collection catalog structures
pub mod models;

/// Client configuration and exclusion rules
pub mod config;

/// Data-source categorization
pub mod specs;

/// Pre-command safety checks
pub mod security;

/// Collection orchestration and single-item collectors
pub mod collectors;

/// Working directory and package lifecycle
pub mod archive;

/// Report scrubbing
pub mod obfuscate;

/// Serial and parallel execution of several catalogs
pub mod runner;

/// Utility functions for naming, path expansion, tags and hashing
pub mod utils;

/// Application constants and configuration values
pub mod constants;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
