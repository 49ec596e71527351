//! Collection orchestration and finalization.
//!
//! [`DataCollector::run_collection`] walks a catalog, applies the exclusion
//! configuration, expands wildcard paths and pre-command arguments, and
//! drives every surviving item into the [`Archive`]. [`DataCollector::done`]
//! then turns the working directory into the run's single output path.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::NamedTempFile;

use super::error::CollectError;
use super::spec::{run_with_combined_output, CommandCollector, Collectable, FileCollector};
use crate::archive::Archive;
use crate::config::{BlacklistReport, ClientConfig, RemoveConf};
use crate::constants::{
    BLACKLIST_REPORT_PATH, BRANCH_INFO_PATH, COMMANDS_DIR, DISPLAY_NAME_PATH, FACTS_NAMESPACE,
    HOSTNAME_SYMBOLIC_NAME, SENSITIVE_LOG_TARGET, TAGS_PATH, VERSION_INFO_PATH,
};
use crate::models::{CollectionSpecs, CommandSpec, FileSpec, GlobSpec};
use crate::obfuscate::{CleanOptions, Scrubber};
use crate::security::blacklist::is_blacklisted;
use crate::utils::mangle::mangle_command;
use crate::utils::paths::{expand_glob, expand_paths};
use crate::utils::tags::{flatten_tags, load_tags};

/// Per-run counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub collected: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// One original/obfuscated address pair from the scrubber's IP report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpPair {
    pub original: String,
    pub obfuscated: String,
}

/// Runs catalog items into an archive and finalizes the result
#[derive(Debug)]
pub struct DataCollector {
    config: ClientConfig,
    archive: Archive,
    hostname_path: Option<String>,
}

impl DataCollector {
    pub fn new(config: ClientConfig, archive: Archive) -> Self {
        Self {
            config,
            archive,
            hostname_path: None,
        }
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn archive_mut(&mut self) -> &mut Archive {
        &mut self.archive
    }

    /// Archive-relative path of the first `hostname` command's output
    pub fn hostname_path(&self) -> Option<&str> {
        self.hostname_path.as_deref()
    }

    /// Collect every catalog item that survives the exclusion rules, then
    /// write the metadata artifacts.
    ///
    /// Individual item failures are logged and counted, never returned.
    pub fn run_collection(
        &mut self,
        specs: &CollectionSpecs,
        rm_conf: Option<&RemoveConf>,
        branch_info: &serde_json::Value,
        blacklist_report: &BlacklistReport,
    ) -> Result<CollectionStats> {
        let empty = RemoveConf::default();
        let rm_conf = rm_conf.unwrap_or(&empty);
        let mut stats = CollectionStats::default();

        debug!("Beginning to run collection spec...");
        match &rm_conf.patterns {
            Some(patterns) if !patterns.is_empty() => {
                warn!("WARNING: Skipping patterns defined in blacklist configuration")
            }
            _ => debug!("Patterns section of blacklist configuration is empty."),
        }

        for spec in &specs.commands {
            self.collect_command(spec, &specs.pre_commands, rm_conf, &mut stats);
        }
        for spec in &specs.files {
            self.collect_file(spec, rm_conf, &mut stats);
        }
        for spec in specs.globs.iter().flatten() {
            self.collect_glob(spec, rm_conf, &mut stats);
        }
        debug!("Spec collection finished.");

        debug!("Collecting metadata...");
        self.write_branch_info(branch_info)?;
        self.write_display_name()?;
        self.write_version_info()?;
        self.write_tags()?;
        self.write_blacklist_report(blacklist_report)?;
        debug!("Metadata collection finished.");

        info!(
            "Collected {} items ({} skipped, {} failed)",
            stats.collected, stats.skipped, stats.failed
        );
        Ok(stats)
    }

    fn collect_command(
        &mut self,
        spec: &CommandSpec,
        pre_commands: &HashMap<String, String>,
        rm_conf: &RemoveConf,
        stats: &mut CollectionStats,
    ) {
        if self.hostname_path.is_none()
            && spec.symbolic_name.as_deref() == Some(HOSTNAME_SYMBOLIC_NAME)
        {
            self.hostname_path = Some(format!("{}/{}", COMMANDS_DIR, mangle_command(&spec.command)));
        }

        let symbolic_excluded = spec
            .symbolic_name
            .as_deref()
            .is_some_and(|name| rm_conf.excludes_command(name));
        if rm_conf.excludes_command(&spec.command) || symbolic_excluded {
            warn!(target: SENSITIVE_LOG_TARGET, "WARNING: Skipping command {}", spec.command);
            stats.skipped += 1;
            return;
        }
        if !(self.config.is_host_root() || spec.image) {
            debug!("Not running {} against a mounted image", spec.command);
            return;
        }

        let expanded = match parse_command_spec(spec, pre_commands) {
            Ok(expanded) => expanded,
            Err(e) => {
                error!("{}", e);
                stats.failed += 1;
                return;
            }
        };

        for spec in expanded {
            if rm_conf.excludes_command(&spec.command) {
                warn!(target: SENSITIVE_LOG_TARGET, "WARNING: Skipping command {}", spec.command);
                stats.skipped += 1;
                continue;
            }
            self.collect(&CommandCollector::new(spec), stats);
        }
    }

    fn collect_file(&self, spec: &FileSpec, rm_conf: &RemoveConf, stats: &mut CollectionStats) {
        let symbolic_excluded = spec
            .symbolic_name
            .as_deref()
            .is_some_and(|name| rm_conf.excludes_file(name));
        if rm_conf.excludes_file(&spec.file) || symbolic_excluded {
            warn!(target: SENSITIVE_LOG_TARGET, "WARNING: Skipping file {}", spec.file);
            stats.skipped += 1;
            return;
        }

        for path in self.parse_file_spec(spec) {
            if rm_conf.excludes_file(&path) {
                warn!(target: SENSITIVE_LOG_TARGET, "WARNING: Skipping file {}", path);
                stats.skipped += 1;
                continue;
            }
            self.collect(&FileCollector::new(&path, &self.config.mountpoint), stats);
        }
    }

    fn collect_glob(&self, spec: &GlobSpec, rm_conf: &RemoveConf, stats: &mut CollectionStats) {
        for path in self.parse_glob_spec(spec) {
            if rm_conf.excludes_file(&path) {
                warn!(target: SENSITIVE_LOG_TARGET, "WARNING: Skipping file {}", path);
                stats.skipped += 1;
                continue;
            }
            self.collect(&FileCollector::new(&path, &self.config.mountpoint), stats);
        }
    }

    fn collect(&self, item: &dyn Collectable, stats: &mut CollectionStats) {
        match self.archive.add_to_archive(item) {
            Ok(true) => stats.collected += 1,
            Ok(false) => {}
            Err(e) => {
                warn!("Failed to collect {}: {}", item.archive_path(), e);
                stats.failed += 1;
            }
        }
    }

    /// Concrete paths for a file spec. A `*` in the path expands against
    /// the collected filesystem; no match yields nothing.
    fn parse_file_spec(&self, spec: &FileSpec) -> Vec<String> {
        if !spec.file.contains('*') {
            return vec![spec.file.clone()];
        }
        let rooted = self.rooted(&spec.file);
        expand_paths(&rooted)
            .iter()
            .map(|path| self.unrooted(path))
            .collect()
    }

    fn parse_glob_spec(&self, spec: &GlobSpec) -> Vec<String> {
        let rooted = self.rooted(&spec.glob);
        expand_glob(&rooted)
            .iter()
            .map(|path| self.unrooted(path))
            .collect()
    }

    /// Catalog path as seen on the collected filesystem
    fn rooted(&self, path: &str) -> String {
        if self.config.is_host_root() {
            return path.to_string();
        }
        self.config
            .mountpoint
            .join(path.trim_start_matches('/'))
            .to_string_lossy()
            .to_string()
    }

    /// Inverse of [`Self::rooted`]
    fn unrooted(&self, path: &str) -> String {
        if self.config.is_host_root() {
            return path.to_string();
        }
        match Path::new(path).strip_prefix(&self.config.mountpoint) {
            Ok(relative) => format!("/{}", relative.display()),
            Err(_) => path.to_string(),
        }
    }

    fn write_branch_info(&self, branch_info: &serde_json::Value) -> Result<()> {
        debug!("Writing branch information to archive...");
        self.archive
            .add_metadata(&serde_json::to_string(branch_info)?, BRANCH_INFO_PATH)
    }

    fn write_display_name(&self) -> Result<()> {
        if let Some(display_name) = &self.config.display_name {
            debug!("Writing display_name to archive...");
            self.archive.add_metadata(display_name, DISPLAY_NAME_PATH)?;
        }
        Ok(())
    }

    fn write_version_info(&self) -> Result<()> {
        debug!("Writing version information to archive...");
        let version_info = json!({
            "core_version": env!("CARGO_PKG_VERSION"),
            "client_version": env!("CARGO_PKG_VERSION"),
        });
        self.archive
            .add_metadata(&version_info.to_string(), VERSION_INFO_PATH)
    }

    fn write_tags(&self) -> Result<()> {
        debug!("Writing tags to archive...");
        let tags = match load_tags(&self.config.tags_file) {
            Ok(Some(tags)) => tags,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!("Skipping tags: {:#}", e);
                return Ok(());
            }
        };
        let flattened = flatten_tags(&tags)?;
        self.archive
            .add_metadata(&serde_json::to_string(&flattened)?, TAGS_PATH)
    }

    fn write_blacklist_report(&self, blacklist_report: &BlacklistReport) -> Result<()> {
        debug!("Writing blacklist report to archive...");
        self.archive
            .add_metadata(&serde_json::to_string(blacklist_report)?, BLACKLIST_REPORT_PATH)
    }

    /// Produce the run's output path.
    ///
    /// | obfuscate | output_dir | result |
    /// |---|---|---|
    /// | no | no | tar file of the working directory |
    /// | no | yes | the working directory |
    /// | yes | no | tar file produced by the scrubber |
    /// | yes | yes | directory produced by the scrubber |
    ///
    /// `Ok(None)` means packaging failed and there is nothing to hand on.
    pub fn done(
        &mut self,
        rm_conf: Option<&RemoveConf>,
        scrubber: &mut dyn Scrubber,
    ) -> Result<Option<PathBuf>> {
        if self.config.obfuscate {
            if rm_conf.is_some_and(|conf| !conf.keywords.is_empty()) {
                warn!("WARNING: Skipping keywords defined in blacklist configuration");
            }

            let options = CleanOptions::new(
                &self.config,
                self.archive.tmp_dir(),
                rm_conf,
                self.hostname_path.as_deref(),
            )?;
            let report = scrubber
                .clean_report(&options, self.archive.archive_dir())
                .context("Failed to obfuscate archive")?;
            drop(options);

            self.write_facts(report.hashed_fqdn.as_deref(), &report.ip_report);

            if self.config.output_dir.is_some() {
                return Ok(Some(report.dir_path));
            }
            if let Some(archive_path) = &report.archive_path {
                self.archive.set_tar_file(archive_path.clone());
            }
            return Ok(report.archive_path);
        }

        if self.config.output_dir.is_some() {
            return Ok(Some(self.archive.archive_dir().to_path_buf()));
        }
        self.archive.create_tar_file()
    }

    /// Record obfuscation state and the IP mapping in the facts file.
    ///
    /// Failures are logged; the run's output is still returned.
    pub fn write_facts(&self, hashed_fqdn: Option<&str>, ip_csv: &Path) {
        let facts_file = &self.config.facts_file;
        info!("Writing RHSM facts to {}...", facts_file.display());

        let ips = match fs::read_to_string(ip_csv) {
            Ok(content) => parse_ip_report(&content),
            Err(e) => {
                error!("Could not read IP report {}: {}", ip_csv.display(), e);
                Vec::new()
            }
        };

        let mut facts = serde_json::Map::new();
        let mut fact = |name: &str, value: serde_json::Value| {
            facts.insert(format!("{}.{}", FACTS_NAMESPACE, name), value);
        };
        fact("obfuscate_hostname_enabled", json!(self.config.obfuscate_hostname));
        fact("hostname", json!(hashed_fqdn));
        fact("obfuscate_ip_enabled", json!(self.config.obfuscate));
        fact("ips", json!(serde_json::to_string(&ips).unwrap_or_default()));

        let facts = serde_json::Value::Object(facts);
        if let Err(e) = replace_file(facts_file, facts.to_string().as_bytes()) {
            error!("Could not write to {}: {}", facts_file.display(), e);
        }
    }
}

/// Replace `path` through a sibling temp file and a rename
fn replace_file(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(content)?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Parse the scrubber's `original,obfuscated` report.
///
/// Engines disagree on column order, so the header decides: a first column
/// named `original` means original-first, anything else obfuscated-first.
pub fn parse_ip_report(content: &str) -> Vec<IpPair> {
    let mut lines = content.lines();
    let Some(header) = lines.next() else {
        return Vec::new();
    };

    let original_first = header
        .trim()
        .split(',')
        .next()
        .is_some_and(|column| column.to_lowercase().contains("original"));
    let (org, obf) = if original_first { (0, 1) } else { (1, 0) };

    lines
        .filter_map(|line| {
            let columns: Vec<&str> = line.trim().split(',').collect();
            match (columns.get(org), columns.get(obf)) {
                (Some(original), Some(obfuscated)) => Some(IpPair {
                    original: original.to_string(),
                    obfuscated: obfuscated.to_string(),
                }),
                _ => {
                    debug!("Ignoring malformed IP report line");
                    None
                }
            }
        })
        .collect()
}

/// Expand a command spec through its pre-command.
///
/// Each output line of the pre-command becomes one command with that line
/// appended as an argument. An unknown alias expands to nothing.
pub fn parse_command_spec(
    spec: &CommandSpec,
    pre_commands: &HashMap<String, String>,
) -> Result<Vec<CommandSpec>, CollectError> {
    let Some(alias) = &spec.pre_command else {
        return Ok(vec![spec.clone()]);
    };
    let Some(pre_command) = pre_commands.get(alias) else {
        debug!("Pre-command {} not found. Skipping {}...", alias, spec.command);
        return Ok(Vec::new());
    };

    if is_blacklisted(pre_command) {
        return Err(CollectError::Blacklisted {
            command: pre_command.clone(),
        });
    }

    let args = run_pre_command(pre_command);
    debug!("Pre-command results: {:?}", args);

    Ok(args
        .into_iter()
        .map(|arg| CommandSpec {
            command: format!("{} {}", spec.command, arg),
            pre_command: None,
            ..spec.clone()
        })
        .collect())
}

/// Run a pre-command through the shell and return its output lines.
///
/// A missing binary or a nonzero exit produces no lines.
pub fn run_pre_command(pre_command: &str) -> Vec<String> {
    debug!("Executing pre-command: {}", pre_command);

    let result = match run_with_combined_output(Command::new("sh").arg("-c").arg(pre_command)) {
        Ok(result) => result,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Command {} not found", pre_command);
            return Vec::new();
        }
        Err(e) => {
            debug!("Could not run pre-command {}: {}", pre_command, e);
            return Vec::new();
        }
    };

    debug!("Pre-command return code: {:?}", result.status.code());
    if !result.status.success() {
        return Vec::new();
    }

    String::from_utf8_lossy(&result.output)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfFormat, Patterns};
    use crate::obfuscate::{CleanReport, MockScrubber};
    use crate::test_utils::{create_host_root, create_temp_dir, test_config};
    use tempfile::TempDir;

    fn collector(config: ClientConfig) -> DataCollector {
        let archive = Archive::new(&config).unwrap();
        DataCollector::new(config, archive)
    }

    fn report(config: &ClientConfig, conf: Option<&RemoveConf>) -> BlacklistReport {
        BlacklistReport::from_conf(conf, config)
    }

    fn commands_conf(commands: &[&str]) -> RemoveConf {
        RemoveConf {
            commands: commands.iter().map(|c| c.to_string()).collect(),
            format: ConfFormat::Structured,
            ..Default::default()
        }
    }

    #[test]
    fn test_excluded_command_not_collected() {
        let scratch = create_temp_dir().unwrap();
        let config = test_config(scratch.path());
        let mut collector = collector(config.clone());
        let conf = commands_conf(&["uptime"]);
        let specs = CollectionSpecs {
            commands: vec![CommandSpec::new("uptime")],
            ..Default::default()
        };

        let stats = collector
            .run_collection(&specs, Some(&conf), &json!({}), &report(&config, Some(&conf)))
            .unwrap();

        assert_eq!(stats.skipped, 1);
        assert!(!collector.archive().archive_dir().join("insights_commands/uptime").exists());
    }

    #[test]
    fn test_excluded_by_symbolic_name() {
        let scratch = create_temp_dir().unwrap();
        let config = test_config(scratch.path());
        let mut collector = collector(config.clone());
        let conf = commands_conf(&["date"]);
        let specs = CollectionSpecs {
            commands: vec![CommandSpec::new("echo today").with_symbolic_name("date")],
            ..Default::default()
        };

        let stats = collector
            .run_collection(&specs, Some(&conf), &json!({}), &report(&config, Some(&conf)))
            .unwrap();
        assert_eq!(stats, CollectionStats { collected: 0, skipped: 1, failed: 0 });
    }

    #[test]
    fn test_commands_and_metadata_written() {
        let scratch = create_temp_dir().unwrap();
        let config = ClientConfig {
            display_name: Some("web-01".to_string()),
            ..test_config(scratch.path())
        };
        let mut collector = collector(config.clone());
        let specs = CollectionSpecs {
            commands: vec![CommandSpec::new("echo hello")],
            ..Default::default()
        };

        let stats = collector
            .run_collection(&specs, None, &json!({"remote_branch": -1}), &report(&config, None))
            .unwrap();
        assert_eq!(stats.collected, 1);

        let dir = collector.archive().archive_dir();
        assert_eq!(fs::read_to_string(dir.join("insights_commands/echo_hello")).unwrap(), "hello\n");
        assert_eq!(fs::read_to_string(dir.join("branch_info")).unwrap(), r#"{"remote_branch":-1}"#);
        assert_eq!(fs::read_to_string(dir.join("display_name")).unwrap(), "web-01");
        assert!(dir.join("version_info").is_file());
        assert!(dir.join("blacklist_report").is_file());
        assert!(!dir.join("tags.json").exists());
    }

    #[test]
    fn test_tags_written_when_present() {
        let scratch = create_temp_dir().unwrap();
        let config = test_config(scratch.path());
        fs::write(&config.tags_file, "env: prod\n").unwrap();
        let mut collector = collector(config.clone());

        collector
            .run_collection(&CollectionSpecs::default(), None, &json!({}), &report(&config, None))
            .unwrap();

        let tags = fs::read_to_string(collector.archive().archive_dir().join("tags.json")).unwrap();
        assert!(tags.contains(r#""key":"env""#));
    }

    #[test]
    fn test_pre_command_expansion() {
        let mut pre_commands = HashMap::new();
        pre_commands.insert("ifaces".to_string(), "printf 'eth0\\neth1\\n'".to_string());
        let spec = CommandSpec::new("echo iface").with_pre_command("ifaces");

        let expanded = parse_command_spec(&spec, &pre_commands).unwrap();
        let commands: Vec<&str> = expanded.iter().map(|s| s.command.as_str()).collect();
        assert_eq!(commands, vec!["echo iface eth0", "echo iface eth1"]);
        assert!(expanded.iter().all(|s| s.pre_command.is_none()));
    }

    #[test]
    fn test_pre_command_missing_alias_or_failure() {
        let mut pre_commands = HashMap::new();
        pre_commands.insert("broken".to_string(), "exit 3".to_string());

        let spec = CommandSpec::new("echo x").with_pre_command("unknown");
        assert!(parse_command_spec(&spec, &pre_commands).unwrap().is_empty());

        let spec = CommandSpec::new("echo x").with_pre_command("broken");
        assert!(parse_command_spec(&spec, &pre_commands).unwrap().is_empty());

        assert!(run_pre_command("/nonexistent/lister --all").is_empty());
    }

    #[test]
    fn test_blacklisted_pre_command_fails_only_that_spec() {
        let scratch = create_temp_dir().unwrap();
        let config = test_config(scratch.path());
        let mut collector = collector(config.clone());
        let mut pre_commands = HashMap::new();
        pre_commands.insert("evil".to_string(), "ls /; rm -rf /tmp/x".to_string());
        let specs = CollectionSpecs {
            commands: vec![
                CommandSpec::new("echo bad").with_pre_command("evil"),
                CommandSpec::new("echo good"),
            ],
            pre_commands,
            ..Default::default()
        };

        let stats = collector
            .run_collection(&specs, None, &json!({}), &report(&config, None))
            .unwrap();
        assert_eq!(stats, CollectionStats { collected: 1, skipped: 0, failed: 1 });
    }

    #[test]
    fn test_expanded_command_rechecked() {
        let scratch = create_temp_dir().unwrap();
        let config = test_config(scratch.path());
        let mut collector = collector(config.clone());
        let mut pre_commands = HashMap::new();
        pre_commands.insert("words".to_string(), "printf 'a\\nb\\n'".to_string());
        let conf = commands_conf(&["echo word a"]);
        let specs = CollectionSpecs {
            commands: vec![CommandSpec::new("echo word").with_pre_command("words")],
            pre_commands,
            ..Default::default()
        };

        let stats = collector
            .run_collection(&specs, Some(&conf), &json!({}), &report(&config, Some(&conf)))
            .unwrap();
        assert_eq!(stats.collected, 1);
        assert_eq!(stats.skipped, 1);
        assert!(collector.archive().archive_dir().join("insights_commands/echo_word_b").exists());
    }

    #[test]
    fn test_hostname_path_recorded_even_when_excluded() {
        let scratch = create_temp_dir().unwrap();
        let config = test_config(scratch.path());
        let mut collector = collector(config.clone());
        let conf = commands_conf(&["/bin/hostname -f"]);
        let specs = CollectionSpecs {
            commands: vec![
                CommandSpec::new("/bin/hostname -f").with_symbolic_name("hostname"),
                CommandSpec::new("/bin/hostname").with_symbolic_name("hostname"),
            ],
            ..Default::default()
        };

        collector
            .run_collection(&specs, Some(&conf), &json!({}), &report(&config, Some(&conf)))
            .unwrap();
        assert_eq!(collector.hostname_path(), Some("insights_commands/hostname_-f"));
    }

    #[test]
    fn test_image_mode_skips_host_commands() {
        let scratch = create_temp_dir().unwrap();
        let root = create_host_root().unwrap();
        let config = ClientConfig {
            mountpoint: root.path().to_path_buf(),
            ..test_config(scratch.path())
        };
        let mut collector = collector(config.clone());
        let specs = CollectionSpecs {
            commands: vec![
                CommandSpec::new("echo host"),
                CommandSpec {
                    image: true,
                    ..CommandSpec::new("echo image")
                },
            ],
            files: vec![FileSpec::new("/etc/hosts")],
            ..Default::default()
        };

        let stats = collector
            .run_collection(&specs, None, &json!({}), &report(&config, None))
            .unwrap();
        assert_eq!(stats.collected, 2);

        let dir = collector.archive().archive_dir();
        assert!(!dir.join("insights_commands/echo_host").exists());
        assert!(dir.join("insights_commands/echo_image").exists());
        assert!(dir.join("etc/hosts").exists());
    }

    #[test]
    fn test_wildcard_files_expand_and_recheck() {
        let scratch = create_temp_dir().unwrap();
        let root = create_host_root().unwrap();
        let config = ClientConfig {
            mountpoint: root.path().to_path_buf(),
            ..test_config(scratch.path())
        };
        let mut collector = collector(config.clone());
        let conf = RemoveConf {
            files: vec!["/etc/app/two.conf".to_string()],
            ..Default::default()
        };
        let specs = CollectionSpecs {
            files: vec![
                FileSpec::new("/etc/app/.*\\.conf"),
                FileSpec::new("/etc/foo*.conf"),
            ],
            ..Default::default()
        };

        let stats = collector
            .run_collection(&specs, Some(&conf), &json!({}), &report(&config, Some(&conf)))
            .unwrap();
        assert_eq!(stats, CollectionStats { collected: 1, skipped: 1, failed: 0 });

        let dir = collector.archive().archive_dir();
        assert!(dir.join("etc/app/one.conf").is_file());
        assert!(!dir.join("etc/app/two.conf").exists());
        assert!(!dir.join("etc/app/notes.txt").exists());
    }

    #[test]
    fn test_globs_collected() {
        let scratch = create_temp_dir().unwrap();
        let root = create_host_root().unwrap();
        let config = ClientConfig {
            mountpoint: root.path().to_path_buf(),
            ..test_config(scratch.path())
        };
        let mut collector = collector(config.clone());
        let specs = CollectionSpecs {
            globs: Some(vec![GlobSpec {
                glob: "/etc/app/*.txt".to_string(),
                symbolic_name: None,
            }]),
            ..Default::default()
        };

        let stats = collector
            .run_collection(&specs, None, &json!({}), &report(&config, None))
            .unwrap();
        assert_eq!(stats.collected, 1);
        assert!(collector.archive().archive_dir().join("etc/app/notes.txt").is_file());
    }

    #[test]
    fn test_patterns_do_not_filter_collection() {
        let scratch = create_temp_dir().unwrap();
        let config = test_config(scratch.path());
        let mut collector = collector(config.clone());
        let conf = RemoveConf {
            patterns: Some(Patterns::Literal(vec!["hello".to_string()])),
            ..Default::default()
        };
        let specs = CollectionSpecs {
            commands: vec![CommandSpec::new("echo hello")],
            ..Default::default()
        };

        collector
            .run_collection(&specs, Some(&conf), &json!({}), &report(&config, Some(&conf)))
            .unwrap();
        let output = collector.archive().archive_dir().join("insights_commands/echo_hello");
        assert_eq!(fs::read_to_string(output).unwrap(), "hello\n");
    }

    #[test]
    fn test_done_tar_without_obfuscation() {
        let scratch = create_temp_dir().unwrap();
        let mut collector = collector(test_config(scratch.path()));
        let mut scrubber = MockScrubber::new();
        scrubber.expect_clean_report().never();

        let path = collector.done(None, &mut scrubber).unwrap().unwrap();
        assert!(path.to_string_lossy().ends_with(".tar.gz"));
    }

    #[test]
    fn test_done_directory_without_obfuscation() {
        let scratch = create_temp_dir().unwrap();
        let config = ClientConfig {
            output_dir: Some(scratch.path().join("out")),
            ..test_config(scratch.path())
        };
        let mut collector = collector(config);
        let mut scrubber = MockScrubber::new();
        scrubber.expect_clean_report().never();

        let path = collector.done(None, &mut scrubber).unwrap().unwrap();
        assert_eq!(path, collector.archive().archive_dir());
    }

    fn obfuscating_scrubber(scratch: &TempDir, with_tar: bool) -> MockScrubber {
        let ip_report = scratch.path().join("ip.csv");
        fs::write(&ip_report, "obfuscated,original\n10.230.230.1,192.168.0.7\n").unwrap();
        let dir_path = scratch.path().join("cleaned");
        let archive_path = with_tar.then(|| scratch.path().join("cleaned.tar.gz"));

        let mut scrubber = MockScrubber::new();
        scrubber
            .expect_clean_report()
            .times(1)
            .withf(|options, _| options.hostname_path.as_deref() == Some("insights_commands/hostname"))
            .returning(move |_, _| {
                Ok(CleanReport {
                    dir_path: dir_path.clone(),
                    archive_path: archive_path.clone(),
                    hashed_fqdn: Some("abc.example.com".to_string()),
                    ip_report: ip_report.clone(),
                })
            });
        scrubber
    }

    #[test]
    fn test_done_obfuscated_tar_and_facts() {
        let scratch = create_temp_dir().unwrap();
        let config = ClientConfig {
            obfuscate: true,
            obfuscate_hostname: true,
            ..test_config(scratch.path())
        };
        fs::create_dir_all(config.facts_file.parent().unwrap()).unwrap();
        let mut collector = collector(config.clone());
        let mut scrubber = obfuscating_scrubber(&scratch, true);

        let path = collector.done(None, &mut scrubber).unwrap().unwrap();
        assert_eq!(path, scratch.path().join("cleaned.tar.gz"));
        assert_eq!(collector.archive().tar_file(), Some(path.as_path()));

        let facts: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&config.facts_file).unwrap()).unwrap();
        assert_eq!(facts["insights_client.hostname"], "abc.example.com");
        assert_eq!(facts["insights_client.obfuscate_ip_enabled"], true);
        let ips: Vec<IpPair> =
            serde_json::from_str(facts["insights_client.ips"].as_str().unwrap()).unwrap();
        assert_eq!(
            ips,
            vec![IpPair {
                original: "192.168.0.7".to_string(),
                obfuscated: "10.230.230.1".to_string(),
            }]
        );
    }

    #[test]
    fn test_concurrent_facts_writes_leave_one_whole_file() {
        let scratch = create_temp_dir().unwrap();
        let config = ClientConfig {
            obfuscate: true,
            ..test_config(scratch.path())
        };
        let facts_dir = config.facts_file.parent().unwrap().to_path_buf();
        fs::create_dir_all(&facts_dir).unwrap();
        fs::write(&config.facts_file, "stale").unwrap();
        let ip_csv = scratch.path().join("ip.csv");
        fs::write(&ip_csv, "original,obfuscated\n192.168.0.7,10.230.230.1\n").unwrap();

        let hostnames: Vec<String> = (0..8).map(|i| format!("host{}.example.com", i)).collect();
        std::thread::scope(|scope| {
            for hostname in &hostnames {
                let (config, ip_csv) = (config.clone(), ip_csv.clone());
                scope.spawn(move || {
                    collector(config).write_facts(Some(hostname.as_str()), &ip_csv)
                });
            }
        });

        let facts: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&config.facts_file).unwrap()).unwrap();
        let written = facts["insights_client.hostname"].as_str().unwrap();
        assert!(hostnames.iter().any(|h| h == written));
        assert_eq!(fs::read_dir(&facts_dir).unwrap().count(), 1);
    }

    #[test]
    fn test_done_obfuscated_directory() {
        let scratch = create_temp_dir().unwrap();
        let config = ClientConfig {
            obfuscate: true,
            obfuscate_hostname: true,
            output_dir: Some(scratch.path().join("out")),
            ..test_config(scratch.path())
        };
        let mut collector = collector(config);
        let mut scrubber = obfuscating_scrubber(&scratch, false);

        let path = collector.done(None, &mut scrubber).unwrap().unwrap();
        assert_eq!(path, scratch.path().join("cleaned"));
    }

    #[test]
    fn test_ip_report_column_detection() {
        let original_first = parse_ip_report("original,obfuscated\n1.1.1.1,10.0.0.1\n");
        let obfuscated_first = parse_ip_report("obfuscated,original\n10.0.0.1,1.1.1.1\n");
        assert_eq!(original_first, obfuscated_first);
        assert_eq!(original_first[0].original, "1.1.1.1");

        assert!(parse_ip_report("").is_empty());
        assert!(parse_ip_report("original,obfuscated\nbroken\n").is_empty());
    }
}
