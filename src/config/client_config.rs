use std::convert::Infallible;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_FACTS_FILE, DEFAULT_LOGGING_FILE, DEFAULT_REMOVE_FILE, DEFAULT_TAGS_FILE,
    DEFAULT_TMP_BASE,
};

/// Compression applied to the tar package.
///
/// Unknown names are kept verbatim: they compress with gzip but keep their
/// own extension.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Compressor {
    #[default]
    Gz,
    Xz,
    Bz2,
    None,
    Other(String),
}

impl Compressor {
    /// Flag passed to `tar c<flag>fS`
    pub fn tar_flag(&self) -> &'static str {
        match self {
            Compressor::Gz => "z",
            Compressor::Xz => "J",
            Compressor::Bz2 => "j",
            Compressor::None => "",
            Compressor::Other(_) => "z",
        }
    }

    /// Extension segment appended after `.tar`, empty for `none`
    pub fn extension(&self) -> String {
        match self {
            Compressor::None => String::new(),
            other => format!(".{}", other),
        }
    }

    /// Whether a failing tar exit means the compressor binary is missing
    pub fn needs_external_binary(&self) -> bool {
        matches!(self, Compressor::Xz | Compressor::Bz2)
    }
}

impl fmt::Display for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compressor::Gz => write!(f, "gz"),
            Compressor::Xz => write!(f, "xz"),
            Compressor::Bz2 => write!(f, "bz2"),
            Compressor::None => write!(f, "none"),
            Compressor::Other(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for Compressor {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "gz" => Compressor::Gz,
            "xz" => Compressor::Xz,
            "bz2" => Compressor::Bz2,
            "none" => Compressor::None,
            other => Compressor::Other(other.to_string()),
        })
    }
}

impl From<String> for Compressor {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(compressor) => compressor,
            Err(never) => match never {},
        }
    }
}

impl From<Compressor> for String {
    fn from(value: Compressor) -> Self {
        value.to_string()
    }
}

/// Runtime configuration for one collection run
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Scrub IP addresses (and optionally the hostname) from the output
    pub obfuscate: bool,
    pub obfuscate_hostname: bool,
    /// Return a directory instead of a tar file
    pub output_dir: Option<PathBuf>,
    pub keep_archive: bool,
    pub no_upload: bool,
    pub compressor: Compressor,
    pub remove_file: PathBuf,
    pub logging_file: PathBuf,
    pub display_name: Option<String>,
    pub tags_file: PathBuf,
    pub facts_file: PathBuf,
    /// Parent directory of the temporary working directories
    pub tmp_base: PathBuf,
    pub mountpoint: PathBuf,
    pub verbose: bool,
    pub validate: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            obfuscate: false,
            obfuscate_hostname: false,
            output_dir: None,
            keep_archive: false,
            no_upload: false,
            compressor: Compressor::Gz,
            remove_file: PathBuf::from(DEFAULT_REMOVE_FILE),
            logging_file: PathBuf::from(DEFAULT_LOGGING_FILE),
            display_name: None,
            tags_file: PathBuf::from(DEFAULT_TAGS_FILE),
            facts_file: PathBuf::from(DEFAULT_FACTS_FILE),
            tmp_base: PathBuf::from(DEFAULT_TMP_BASE),
            mountpoint: PathBuf::from("/"),
            verbose: false,
            validate: false,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: ClientConfig = serde_yaml::from_str(&content)
            .context("Failed to parse YAML config")?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Reject option combinations that cannot be honoured
    pub fn validate(&self) -> Result<()> {
        if self.obfuscate_hostname && !self.obfuscate {
            bail!("Option `obfuscate_hostname` requires `obfuscate`");
        }
        Ok(())
    }

    /// Fail when the requested output directory is already taken
    pub fn check_output_dir(&self) -> Result<()> {
        if let Some(output_dir) = &self.output_dir {
            if output_dir.exists() {
                bail!("Output directory {} already exists", output_dir.display());
            }
        }
        Ok(())
    }

    /// True when collecting from the live host rather than a mounted image
    pub fn is_host_root(&self) -> bool {
        self.mountpoint == Path::new("/")
    }
}

/// Load the configuration file if one is given and exists, otherwise defaults.
pub fn load_or_default(config_path: Option<&Path>) -> Result<ClientConfig> {
    match config_path {
        Some(path) if path.exists() => ClientConfig::from_yaml_file(path),
        Some(path) => {
            info!("Config file {} not found, using defaults", path.display());
            Ok(ClientConfig::default())
        }
        None => Ok(ClientConfig::default()),
    }
}
