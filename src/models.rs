use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

/// A command to run, optionally expanded by a pre-command.
///
/// A spec carrying `pre_command` has no literal arguments until the
/// pre-command output is appended to `command`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbolic_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_command: Option<String>,
    /// Allowed to run when collecting from a mounted image
    #[serde(default)]
    pub image: bool,
}

/// A file to copy. Paths containing `*` are expanded before collection.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbolic_name: Option<String>,
}

/// A filesystem glob whose matches are collected as files.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GlobSpec {
    pub glob: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbolic_name: Option<String>,
}

/// The resolved collection catalog for one run.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct CollectionSpecs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
    #[serde(default)]
    pub files: Vec<FileSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub globs: Option<Vec<GlobSpec>>,
    /// Alias -> shell command whose output lines become arguments
    #[serde(default)]
    pub pre_commands: HashMap<String, String>,
}

impl CollectionSpecs {
    /// Load a catalog from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read collection specs: {}", path.display()))?;

        let specs: CollectionSpecs = serde_json::from_str(&content)
            .context("Failed to parse collection specs JSON")?;

        debug!(
            "Loaded {} commands, {} files and {} globs from {}",
            specs.commands.len(),
            specs.files.len(),
            specs.globs.as_ref().map_or(0, Vec::len),
            path.display()
        );
        Ok(specs)
    }
}

impl CommandSpec {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            symbolic_name: None,
            pre_command: None,
            image: false,
        }
    }

    pub fn with_symbolic_name(mut self, name: &str) -> Self {
        self.symbolic_name = Some(name.to_string());
        self
    }

    pub fn with_pre_command(mut self, alias: &str) -> Self {
        self.pre_command = Some(alias.to_string());
        self
    }
}

impl FileSpec {
    pub fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            symbolic_name: None,
        }
    }

    pub fn with_symbolic_name(mut self, name: &str) -> Self {
        self.symbolic_name = Some(name.to_string());
        self
    }
}
