use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ClientConfig, Compressor};

/// Command-line arguments for diag-collector.
///
/// Flags given here override the values loaded from `--config`.
#[derive(Parser, Debug)]
#[clap(name = "diag-collector", about = "Host diagnostic data collector", version)]
pub struct Args {
    /// Collection catalog (JSON). Repeat to collect several catalogs
    #[clap(short, long = "specs")]
    pub specs: Vec<PathBuf>,

    /// Path to configuration YAML file
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Obfuscate IP addresses in the collected data
    #[clap(long)]
    pub obfuscate: bool,

    /// Obfuscate the hostname as well (requires --obfuscate)
    #[clap(long)]
    pub obfuscate_hostname: bool,

    /// Write the collected data to this directory instead of a tar file
    #[clap(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Keep the packaged archive after exit
    #[clap(long)]
    pub keep_archive: bool,

    /// Collect without uploading
    #[clap(long)]
    pub no_upload: bool,

    /// Archive compression: gz, xz, bz2 or none
    #[clap(long)]
    pub compressor: Option<String>,

    /// Exclusion file
    #[clap(long)]
    pub remove_file: Option<PathBuf>,

    /// Display name recorded in the archive
    #[clap(long)]
    pub display_name: Option<String>,

    /// Root of a mounted image to collect from
    #[clap(long)]
    pub mountpoint: Option<PathBuf>,

    /// JSON file with branch information
    #[clap(long)]
    pub branch_info: Option<PathBuf>,

    /// Collect several catalogs concurrently
    #[clap(long)]
    pub parallel: bool,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands for the collector.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the exclusion file's permissions and schema, then print it
    Validate,

    /// Print the commands and paths a data-source list may touch
    SpecReport {
        /// JSON list of data-source descriptors
        path: PathBuf,
    },

    /// Write the effective configuration to a YAML file
    InitConfig {
        /// Path to output configuration file
        #[clap(default_value = "diag-collector.yaml")]
        path: PathBuf,
    },
}

impl Args {
    /// Overlay the command-line flags on a loaded configuration
    pub fn apply_to(&self, config: &mut ClientConfig) {
        config.obfuscate |= self.obfuscate;
        config.obfuscate_hostname |= self.obfuscate_hostname;
        config.keep_archive |= self.keep_archive;
        config.no_upload |= self.no_upload;
        config.verbose |= self.verbose;

        if let Some(output_dir) = &self.output_dir {
            config.output_dir = Some(output_dir.clone());
        }
        if let Some(compressor) = &self.compressor {
            config.compressor = Compressor::from(compressor.clone());
        }
        if let Some(remove_file) = &self.remove_file {
            config.remove_file = remove_file.clone();
        }
        if let Some(display_name) = &self.display_name {
            config.display_name = Some(display_name.clone());
        }
        if let Some(mountpoint) = &self.mountpoint {
            config.mountpoint = mountpoint.clone();
        }
        if matches!(self.command, Some(Commands::Validate)) {
            config.validate = true;
        }
    }
}
