//! Global constants for the diag-collector application.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

/// Application name, used as the tag namespace
pub const APP_NAME: &str = "insights-client";

/// Namespace prefix for keys in the derived facts file
pub const FACTS_NAMESPACE: &str = "insights_client";

/// Log target for notices that print literal commands or paths.
///
/// Skip/exclude notices may themselves be sensitive, so they are kept on a
/// separate target that operators can filter.
pub const SENSITIVE_LOG_TARGET: &str = "diag_collector::sensitive";

/// Executables that must never run as part of pre-command expansion
pub const COMMAND_BLACKLIST: &[&str] = &["rm", "kill", "reboot", "shutdown"];

/// Maximum re-tokenization depth for nested shell strings
pub const MAX_NESTING_DEPTH: usize = 8;

/// Sections allowed in the exclusion configuration
pub const EXPECTED_KEYS: &[&str] = &["commands", "files", "patterns", "keywords"];

/// Section name used by the legacy flat exclusion format
pub const LEGACY_SECTION: &str = "remove";

/// Required permission bits on the exclusion file
pub const REMOVE_FILE_MODE: u32 = 0o600;

/// Symbolic name of the command whose output carries the hostname
pub const HOSTNAME_SYMBOLIC_NAME: &str = "hostname";

/// Archive-relative directory holding command output
pub const COMMANDS_DIR: &str = "insights_commands";

/// Fallback archive-relative path of the hostname output
pub const DEFAULT_HOSTNAME_PATH: &str = "insights_commands/hostname";

/// Maximum length of a mangled command file name
pub const MANGLE_NAME_MAX: usize = 255;

// Metadata artifacts
pub const BRANCH_INFO_PATH: &str = "/branch_info";
pub const DISPLAY_NAME_PATH: &str = "/display_name";
pub const VERSION_INFO_PATH: &str = "/version_info";
pub const TAGS_PATH: &str = "/tags.json";
pub const BLACKLIST_REPORT_PATH: &str = "/blacklist_report";

// Default file locations
pub const DEFAULT_REMOVE_FILE: &str = "/etc/insights-client/remove.conf";
pub const DEFAULT_TAGS_FILE: &str = "/etc/insights-client/tags.yaml";
pub const DEFAULT_LOGGING_FILE: &str = "/var/log/insights-client/insights-client.log";
pub const DEFAULT_FACTS_FILE: &str = "/etc/rhsm/facts/insights-client.facts";
pub const DEFAULT_TMP_BASE: &str = "/var/tmp";

/// Name used when no archive name could be derived
pub const DEFAULT_ARCHIVE_NAME: &str = "insights-archive";

/// Domain appended to the hashed hostname produced by the cleaner
pub const OBFUSCATED_DOMAIN: &str = "example.com";

/// First three octets of the addresses handed out by the cleaner
pub const OBFUSCATED_IP_PREFIX: &str = "10.230.230";

/// Worker pool floor for parallel collection
pub const MIN_WORKERS: usize = 2;
