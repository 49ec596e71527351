//! Loading and validation of the operator-maintained exclusion file
//! ("remove.conf").
//!
//! The file is parsed in two phases: first into a loosely-typed YAML
//! document, then field by field into a strict [`RemoveConf`]. Files that are
//! not YAML mappings fall back to the legacy flat INI format.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::config::client_config::ClientConfig;
use crate::config::error::ConfigError;
use crate::config::legacy;
use crate::constants::{EXPECTED_KEYS, LEGACY_SECTION, REMOVE_FILE_MODE};

/// Content patterns, either literal substrings or regular expressions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Patterns {
    Literal(Vec<String>),
    Regex { regex: Vec<String> },
}

impl Patterns {
    pub fn len(&self) -> usize {
        match self {
            Patterns::Literal(list) => list.len(),
            Patterns::Regex { regex } => regex.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which parser produced a [`RemoveConf`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfFormat {
    #[default]
    Structured,
    Legacy,
}

/// A validated exclusion configuration.
///
/// Empty sections are dropped at load time, so an empty list here always
/// means "not configured".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RemoveConf {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Patterns>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip)]
    pub format: ConfFormat,
}

impl RemoveConf {
    /// True when nothing is excluded
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
            && self.files.is_empty()
            && self.patterns.is_none()
            && self.keywords.is_empty()
    }

    pub fn excludes_command(&self, command: &str) -> bool {
        self.commands.iter().any(|c| c == command)
    }

    pub fn excludes_file(&self, file: &str) -> bool {
        self.files.iter().any(|f| f == file)
    }

    /// Render as YAML for operator review
    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_else(|e| format!("<unprintable: {}>", e))
    }
}

/// Loader bound to one exclusion file
#[derive(Debug, Clone)]
pub struct RemoveConfLoader {
    remove_file: PathBuf,
    logging_file: PathBuf,
    print_contents: bool,
}

impl RemoveConfLoader {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            remove_file: config.remove_file.clone(),
            logging_file: config.logging_file.clone(),
            print_contents: config.verbose || config.validate,
        }
    }

    /// Loader for an arbitrary path, printing nothing on validation
    pub fn with_path(remove_file: impl Into<PathBuf>) -> Self {
        Self {
            remove_file: remove_file.into(),
            logging_file: PathBuf::from(crate::constants::DEFAULT_LOGGING_FILE),
            print_contents: false,
        }
    }

    pub fn remove_file(&self) -> &Path {
        &self.remove_file
    }

    /// Load the exclusion file.
    ///
    /// Returns `Ok(None)` when no file exists, and an empty configuration
    /// when the file is an empty YAML document.
    pub fn get_rm_conf(&self) -> Result<Option<RemoveConf>, ConfigError> {
        if !self.remove_file.is_file() {
            debug!("No remove.conf defined. No files/commands will be ignored.");
            return Ok(None);
        }

        let content = fs::read_to_string(&self.remove_file)
            .map_err(|e| ConfigError::io(&self.remove_file, e))?;

        let document: Value = match serde_yaml::from_str(&content) {
            Ok(document) => document,
            Err(e) => {
                debug!(
                    "ERROR: Cannot parse remove.conf as a YAML file.\n\
                     If using any YAML tokens such as [] in an expression, \
                     be sure to wrap the expression in quotation marks.\n\nError details:\n{}\n",
                    e
                );
                return self.get_rm_conf_old(&content).map(Some);
            }
        };

        match document {
            Value::Null => {
                warn!("WARNING: Remove file {} is empty.", self.remove_file.display());
                Ok(Some(RemoveConf::default()))
            }
            Value::Mapping(mapping) => parse_structured(&mapping).map(Some),
            _ => {
                debug!("ERROR: Invalid YAML loaded.");
                self.get_rm_conf_old(&content).map(Some)
            }
        }
    }

    /// Parse the legacy `[remove]` INI format
    fn get_rm_conf_old(&self, content: &str) -> Result<RemoveConf, ConfigError> {
        debug!("Trying to parse as INI file.");
        let unparseable = || ConfigError::Unparseable {
            log_file: self.logging_file.clone(),
        };

        let sections = legacy::parse_sections(content).map_err(|e| {
            debug!("{}", e);
            unparseable()
        })?;
        let (_, options) = sections
            .into_iter()
            .find(|(name, _)| name == LEGACY_SECTION)
            .ok_or_else(|| {
                debug!("No section: '{}'", LEGACY_SECTION);
                unparseable()
            })?;

        let mut conf = RemoveConf {
            format: ConfFormat::Legacy,
            ..Default::default()
        };
        for (item, value) in options {
            if !EXPECTED_KEYS.contains(&item.as_str()) {
                return Err(ConfigError::UnknownLegacySection { section: item });
            }
            let decoded = legacy::decode_escapes(value.trim()).map_err(|e| {
                debug!("{}", e);
                unparseable()
            })?;
            if decoded.is_empty() {
                continue;
            }
            let list: Vec<String> = decoded.split(',').map(str::to_string).collect();
            match item.as_str() {
                "commands" => conf.commands = list,
                "files" => conf.files = list,
                "patterns" => conf.patterns = Some(Patterns::Literal(list)),
                _ => conf.keywords = list,
            }
        }

        Ok(conf)
    }

    /// Check permissions and schema of the exclusion file.
    ///
    /// The file must exist with mode exactly `0600`, otherwise it is not
    /// parsed at all. On success the parsed content is printed for review.
    pub fn validate(&self) -> Result<bool, ConfigError> {
        if !self.remove_file.is_file() {
            warn!("WARNING: Remove file does not exist");
            return Ok(false);
        }

        let metadata = fs::metadata(&self.remove_file)
            .map_err(|e| ConfigError::io(&self.remove_file, e))?;
        let mode = metadata.permissions().mode() & 0o7777;
        if mode != REMOVE_FILE_MODE {
            error!(
                "WARNING: Invalid remove file permissions. Expected 0600 got {:#o}",
                mode
            );
            return Ok(false);
        }
        debug!("Correct file permissions");

        let Some(conf) = self.get_rm_conf()? else {
            error!("Could not parse remove.conf");
            return Ok(false);
        };

        // Printed rather than logged: the content may be sensitive
        if self.print_contents {
            println!("Remove file parsed contents:");
            println!("{}", conf.to_yaml());
            info!("Parsed successfully.");
        }
        Ok(true)
    }
}

/// Validate a YAML mapping into a [`RemoveConf`]
fn parse_structured(mapping: &Mapping) -> Result<RemoveConf, ConfigError> {
    let mut invalid_keys: Vec<String> = mapping
        .keys()
        .map(key_name)
        .filter(|k| !EXPECTED_KEYS.contains(&k.as_str()))
        .collect();
    if !invalid_keys.is_empty() {
        invalid_keys.sort();
        invalid_keys.dedup();
        return Err(ConfigError::UnknownSections { keys: invalid_keys });
    }

    let mut conf = RemoveConf::default();
    for key in EXPECTED_KEYS {
        let Some(value) = mapping.get(*key) else {
            continue;
        };
        match *key {
            "commands" => conf.commands = list_of_strings(value, key)?,
            "files" => conf.files = list_of_strings(value, key)?,
            "patterns" => conf.patterns = parse_patterns(value)?,
            _ => conf.keywords = list_of_strings(value, key)?,
        }
    }

    Ok(conf)
}

fn key_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

/// Null counts as an empty list
fn list_of_strings(value: &Value, section: &str) -> Result<Vec<String>, ConfigError> {
    strings(value).ok_or_else(|| ConfigError::NotListOfStrings {
        section: section.to_string(),
    })
}

fn strings(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Null => Some(Vec::new()),
        Value::Sequence(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

fn parse_patterns(value: &Value) -> Result<Option<Patterns>, ConfigError> {
    let patterns = match value {
        Value::Mapping(object) => {
            let regex = object.get("regex").ok_or(ConfigError::PatternsMissingRegex)?;
            if object.len() > 1 {
                return Err(ConfigError::PatternsUnknownKeys);
            }
            let regex = strings(regex).ok_or(ConfigError::RegexNotListOfStrings)?;
            Patterns::Regex { regex }
        }
        other => Patterns::Literal(list_of_strings(other, "patterns")?),
    };

    Ok((!patterns.is_empty()).then_some(patterns))
}

/// Summary of the active exclusions, written into the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlacklistReport {
    pub obfuscate: bool,
    pub obfuscate_hostname: bool,
    pub commands: usize,
    pub files: usize,
    pub patterns: usize,
    pub keywords: usize,
    pub using_new_format: bool,
    pub using_patterns_regex: bool,
}

impl BlacklistReport {
    pub fn from_conf(conf: Option<&RemoveConf>, config: &ClientConfig) -> Self {
        let empty = RemoveConf::default();
        let loaded = conf.is_some();
        let conf = conf.unwrap_or(&empty);
        Self {
            obfuscate: config.obfuscate,
            obfuscate_hostname: config.obfuscate_hostname,
            commands: conf.commands.len(),
            files: conf.files.len(),
            patterns: conf.patterns.as_ref().map_or(0, Patterns::len),
            keywords: conf.keywords.len(),
            using_new_format: loaded && conf.format == ConfFormat::Structured,
            using_patterns_regex: matches!(conf.patterns, Some(Patterns::Regex { .. })),
        }
    }
}
