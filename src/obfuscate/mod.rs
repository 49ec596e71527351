//! Boundary to the report scrubbing engine.
//!
//! The finalizer hands the working directory to a [`Scrubber`] together
//! with [`CleanOptions`] and gets back a [`CleanReport`] describing where
//! the scrubbed output landed. [`ReportCleaner`] is the built-in engine.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use tempfile::NamedTempFile;

#[cfg(test)]
use mockall::automock;

use crate::config::{ClientConfig, RemoveConf};
use crate::constants::DEFAULT_HOSTNAME_PATH;

mod cleaner;

pub use cleaner::ReportCleaner;

/// Inputs for one scrubbing pass
#[derive(Debug)]
pub struct CleanOptions {
    /// Directory the engine writes its output and reports into
    pub report_dir: PathBuf,
    /// Newline-separated keywords, removed from disk when dropped
    pub keyword_file: Option<NamedTempFile>,
    /// Archive-relative path of the hostname output, set when hostnames
    /// are obfuscated
    pub hostname_path: Option<String>,
    /// Leave the result as a directory instead of a tar file
    pub no_tar_file: bool,
}

impl CleanOptions {
    pub fn new(
        config: &ClientConfig,
        report_dir: &Path,
        rm_conf: Option<&RemoveConf>,
        hostname_path: Option<&str>,
    ) -> Result<Self> {
        let keyword_file = match rm_conf {
            Some(conf) if !conf.keywords.is_empty() => {
                let mut file = NamedTempFile::new().context("Failed to create keyword file")?;
                file.write_all(conf.keywords.join("\n").as_bytes())
                    .and_then(|_| file.flush())
                    .context("Failed to write keyword file")?;
                debug!("Attempting keyword obfuscation");
                Some(file)
            }
            _ => None,
        };

        let hostname_path = config
            .obfuscate_hostname
            .then(|| hostname_path.unwrap_or(DEFAULT_HOSTNAME_PATH).to_string());

        Ok(Self {
            report_dir: report_dir.to_path_buf(),
            keyword_file,
            hostname_path,
            no_tar_file: config.output_dir.is_some(),
        })
    }

    pub fn keyword_path(&self) -> Option<&Path> {
        self.keyword_file.as_ref().map(NamedTempFile::path)
    }
}

/// Where a scrubbing pass left its output
#[derive(Debug, Clone, PartialEq)]
pub struct CleanReport {
    /// Scrubbed copy of the report directory
    pub dir_path: PathBuf,
    /// Packaged scrubbed copy, absent when directory output was requested
    pub archive_path: Option<PathBuf>,
    /// Replacement hostname, when hostnames were obfuscated
    pub hashed_fqdn: Option<String>,
    /// Two-column CSV mapping original to obfuscated addresses
    pub ip_report: PathBuf,
}

/// A content scrubbing engine
#[cfg_attr(test, automock)]
pub trait Scrubber {
    fn clean_report(&mut self, options: &CleanOptions, archive_dir: &Path) -> Result<CleanReport>;
}
