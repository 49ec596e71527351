//! Catalog collection.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             DataCollector               │
//! │   exclusion checks, wildcard and        │
//! │   pre-command expansion, metadata       │
//! ├─────────────────────────────────────────┤
//! │          Single-item collectors         │
//! │  ┌──────────────────┬────────────────┐  │
//! │  │ CommandCollector │ FileCollector  │  │
//! │  └──────────────────┴────────────────┘  │
//! ├─────────────────────────────────────────┤
//! │                Archive                  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```no_run
//! use diag_collector::archive::Archive;
//! use diag_collector::collectors::DataCollector;
//! use diag_collector::config::{BlacklistReport, ClientConfig};
//! use diag_collector::models::{CollectionSpecs, CommandSpec};
//! use diag_collector::obfuscate::ReportCleaner;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::default();
//! let specs = CollectionSpecs {
//!     commands: vec![CommandSpec::new("/usr/bin/uptime")],
//!     ..Default::default()
//! };
//!
//! let archive = Archive::new(&config)?;
//! let mut collector = DataCollector::new(config.clone(), archive);
//! let report = BlacklistReport::from_conf(None, &config);
//! collector.run_collection(&specs, None, &serde_json::json!({}), &report)?;
//!
//! let output = collector.done(None, &mut ReportCleaner::new())?;
//! println!("Output: {:?}", output);
//! # Ok(())
//! # }
//! ```

/// Orchestration of one collection run and its finalization
pub mod data_collector;

/// Single-item command and file collectors
pub mod spec;

mod error;

// Re-export commonly used types
pub use data_collector::{parse_ip_report, CollectionStats, DataCollector, IpPair};
pub use error::CollectError;
pub use spec::{run_with_combined_output, Collectable, CommandCollector, FileCollector};

#[cfg(test)]
pub use spec::MockCollectable;
