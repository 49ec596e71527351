//! End-to-end tests for collection runs.
//!
//! Each test builds a scratch configuration, runs a catalog through the
//! collector and checks what ends up in the output.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use anyhow::Result;
use serde_json::json;
use tempfile::TempDir;

use diag_collector::archive::Archive;
use diag_collector::collectors::DataCollector;
use diag_collector::config::{BlacklistReport, ClientConfig, Compressor, RemoveConfLoader};
use diag_collector::models::{CollectionSpecs, CommandSpec, FileSpec};
use diag_collector::obfuscate::ReportCleaner;

fn scratch_config(scratch: &Path) -> ClientConfig {
    let tmp_base = scratch.join("tmp");
    fs::create_dir_all(&tmp_base).unwrap();
    ClientConfig {
        remove_file: scratch.join("remove.conf"),
        tags_file: scratch.join("tags.yaml"),
        facts_file: scratch.join("insights-client.facts"),
        tmp_base,
        ..Default::default()
    }
}

fn write_catalog(dir: &Path, catalog: serde_json::Value) -> Result<CollectionSpecs> {
    let path = dir.join("catalog.json");
    fs::write(&path, catalog.to_string())?;
    CollectionSpecs::from_json_file(&path)
}

/// Run a full collection and finalize it
fn collect(config: &ClientConfig, specs: &CollectionSpecs) -> Result<(DataCollector, Option<std::path::PathBuf>)> {
    let rm_conf = RemoveConfLoader::new(config).get_rm_conf()?;
    let report = BlacklistReport::from_conf(rm_conf.as_ref(), config);

    let mut collector = DataCollector::new(config.clone(), Archive::new(config)?);
    collector.run_collection(specs, rm_conf.as_ref(), &json!({"remote_branch": -1}), &report)?;
    let output = collector.done(rm_conf.as_ref(), &mut ReportCleaner::new())?;
    Ok((collector, output))
}

#[test]
fn test_excluded_uptime_is_not_collected() -> Result<()> {
    let scratch = TempDir::new()?;
    let mut config = scratch_config(scratch.path());
    config.output_dir = Some(scratch.path().join("out"));
    fs::write(&config.remove_file, r#"{"commands": ["uptime"]}"#)?;
    fs::set_permissions(&config.remove_file, fs::Permissions::from_mode(0o600))?;

    let specs = write_catalog(
        scratch.path(),
        json!({"commands": [{"command": "uptime"}], "files": [], "pre_commands": {}}),
    )?;
    let (_collector, output) = collect(&config, &specs)?;

    let archive_dir = output.expect("directory output");
    assert!(!archive_dir.join("insights_commands/uptime").exists());

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(archive_dir.join("blacklist_report"))?)?;
    assert_eq!(report["commands"], 1);
    assert_eq!(report["using_new_format"], true);
    Ok(())
}

#[test]
fn test_wildcard_without_matches_collects_nothing() -> Result<()> {
    let scratch = TempDir::new()?;
    let mut config = scratch_config(scratch.path());
    config.output_dir = Some(scratch.path().join("out"));

    let specs = CollectionSpecs {
        files: vec![FileSpec::new("/etc/foo-nonexistent-for-tests*.conf")],
        ..Default::default()
    };
    let rm_conf = None;
    let report = BlacklistReport::from_conf(rm_conf, &config);
    let mut collector = DataCollector::new(config.clone(), Archive::new(&config)?);

    let stats = collector.run_collection(&specs, rm_conf, &json!({}), &report)?;
    assert_eq!(stats.collected, 0);
    assert_eq!(stats.failed, 0);
    Ok(())
}

#[test]
fn test_tar_extension_follows_compressor() -> Result<()> {
    for (compressor, suffix) in [(Compressor::Gz, ".tar.gz"), (Compressor::None, ".tar")] {
        let scratch = TempDir::new()?;
        let config = ClientConfig {
            compressor,
            ..scratch_config(scratch.path())
        };
        let specs = CollectionSpecs {
            commands: vec![CommandSpec::new("echo packaged")],
            ..Default::default()
        };

        let (_collector, output) = collect(&config, &specs)?;
        let tar_file = output.expect("tar output");
        assert!(tar_file.to_string_lossy().ends_with(suffix), "{}", tar_file.display());
        assert!(tar_file.is_file());
    }
    Ok(())
}

#[test]
fn test_obfuscated_directory_run() -> Result<()> {
    let scratch = TempDir::new()?;
    let config = ClientConfig {
        obfuscate: true,
        obfuscate_hostname: true,
        output_dir: Some(scratch.path().join("out")),
        ..scratch_config(scratch.path())
    };
    let specs = CollectionSpecs {
        commands: vec![
            CommandSpec::new("echo db01.example.net").with_symbolic_name("hostname"),
            CommandSpec::new("echo addr 172.16.4.20 on db01.example.net"),
        ],
        ..Default::default()
    };

    let (collector, output) = collect(&config, &specs)?;
    assert_eq!(collector.hostname_path(), Some("insights_commands/echo_db01.example.net"));

    let cleaned = output.expect("cleaned directory");
    let addr = fs::read_to_string(cleaned.join("insights_commands/echo_addr_172.16.4.20_on_db01.example.net"))?;
    assert!(!addr.contains("172.16.4.20"));
    assert!(!addr.contains("db01"));

    let facts: serde_json::Value = serde_json::from_str(&fs::read_to_string(&config.facts_file)?)?;
    assert_eq!(facts["insights_client.obfuscate_hostname_enabled"], true);
    assert!(facts["insights_client.hostname"].as_str().unwrap().ends_with(".example.com"));
    assert!(facts["insights_client.ips"].as_str().unwrap().contains("172.16.4.20"));
    Ok(())
}

#[test]
fn test_cleanup_twice_leaves_nothing() -> Result<()> {
    let scratch = TempDir::new()?;
    let config = scratch_config(scratch.path());
    let mut archive = Archive::new(&config)?;
    let tmp_dir = archive.tmp_dir().to_path_buf();

    archive.cleanup();
    archive.cleanup();
    drop(archive);

    assert!(!tmp_dir.exists());
    assert_eq!(fs::read_dir(&config.tmp_base)?.count(), 0);
    Ok(())
}
