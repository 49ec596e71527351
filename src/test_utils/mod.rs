//! Test utilities for diag-collector
//!
//! Common fixtures shared by the unit tests of every module.

#![cfg(test)]

use anyhow::Result;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::ClientConfig;

/// Creates a temporary directory that is automatically cleaned up
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Writes an exclusion file with the given permission bits
pub fn write_remove_file(dir: &Path, content: &str, mode: u32) -> PathBuf {
    let path = dir.join("remove.conf");
    fs::write(&path, content).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    path
}

/// Creates a fake host root with a few files to collect
pub fn create_host_root() -> Result<TempDir> {
    let root = create_temp_dir()?;
    let base = root.path();

    fs::create_dir_all(base.join("etc/app"))?;
    fs::write(base.join("etc/hosts"), "127.0.0.1 localhost\n192.168.10.5 web01\n")?;
    fs::write(base.join("etc/app/one.conf"), "listen 10.0.0.1\n")?;
    fs::write(base.join("etc/app/two.conf"), "listen 10.0.0.2\n")?;
    fs::write(base.join("etc/app/notes.txt"), "not a config\n")?;

    Ok(root)
}

/// Client configuration whose every path lives under `scratch`
pub fn test_config(scratch: &Path) -> ClientConfig {
    let tmp_base = scratch.join("tmp");
    fs::create_dir_all(&tmp_base).unwrap();

    ClientConfig {
        remove_file: scratch.join("remove.conf"),
        logging_file: scratch.join("client.log"),
        tags_file: scratch.join("tags.yaml"),
        facts_file: scratch.join("facts/insights-client.facts"),
        tmp_base,
        ..Default::default()
    }
}
