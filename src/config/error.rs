//! Error types for exclusion configuration loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::constants::EXPECTED_KEYS;

/// Errors raised while loading or validating the exclusion file.
///
/// Every variant is a configuration problem the operator has to fix; none
/// of them is silently coerced into "exclude nothing".
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Top-level keys outside the allowed set
    #[error(
        "Unknown section(s) in remove.conf: {}\nValid sections are {}.",
        .keys.join(", "),
        EXPECTED_KEYS.join(", ")
    )]
    UnknownSections { keys: Vec<String> },

    /// Legacy-format option outside the allowed set
    #[error(
        "Unknown section in remove.conf: {section}\nValid sections are {}.",
        EXPECTED_KEYS.join(", ")
    )]
    UnknownLegacySection { section: String },

    /// A list-valued section holding something other than strings
    #[error("{section} section must be a list of strings.")]
    NotListOfStrings { section: String },

    #[error("Patterns section contains an object but the \"regex\" key was not specified.")]
    PatternsMissingRegex,

    #[error("Unknown keys in the patterns section. Only \"regex\" is valid.")]
    PatternsUnknownKeys,

    #[error("regex section under patterns must be a list of strings.")]
    RegexNotListOfStrings,

    /// Neither the structured nor the legacy parser accepted the file
    #[error(
        "Cannot parse the remove.conf file as a YAML file nor as an INI file. \
         Please check the file formatting.\nSee {} for more information.",
        .log_file.display()
    )]
    Unparseable { log_file: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}
