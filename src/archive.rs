//! Working directory and package lifecycle for one collection run.
//!
//! An [`Archive`] owns two scratch directories under the configured
//! temporary base:
//!
//! - the working directory, holding `insights-<host>-<timestamp>/` where
//!   collected items and metadata are written
//! - the packaging directory, only when the run is not obfuscated, which
//!   receives the tar file
//!
//! Both are removed by [`Archive::cleanup`], which also runs on drop.

use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use chrono::Local;
use log::{debug, error, info};
use uuid::Uuid;

use crate::collectors::{CollectError, Collectable};
use crate::config::{ClientConfig, Compressor};
use crate::constants::{COMMANDS_DIR, DEFAULT_ARCHIVE_NAME};

/// Lifecycle owner of the working and packaging directories
#[derive(Debug)]
pub struct Archive {
    compressor: Compressor,
    keep_archive: bool,
    no_upload: bool,
    obfuscate: bool,
    archive_name: String,
    tmp_dir: PathBuf,
    archive_tmp_dir: Option<PathBuf>,
    archive_dir: PathBuf,
    tar_file: Option<PathBuf>,
    cleaned: bool,
}

impl Archive {
    /// Create the scratch directories for a run
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let tmp_dir = create_private_dir(&config.tmp_base)?;
        let archive_tmp_dir = if config.obfuscate {
            None
        } else {
            Some(create_private_dir(&config.tmp_base)?)
        };

        let archive_name = archive_name();
        let archive_dir = tmp_dir.join(&archive_name);
        DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(archive_dir.join(COMMANDS_DIR))
            .context(format!("Failed to create archive directory: {}", archive_dir.display()))?;

        debug!("Archive working directory: {}", archive_dir.display());

        Ok(Self {
            compressor: config.compressor.clone(),
            keep_archive: config.keep_archive,
            no_upload: config.no_upload,
            obfuscate: config.obfuscate,
            archive_name,
            tmp_dir,
            archive_tmp_dir,
            archive_dir,
            tar_file: None,
            cleaned: false,
        })
    }

    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    /// Directory collected items are written into
    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Parent of the archive directory, the root that gets packaged
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    pub fn archive_tmp_dir(&self) -> Option<&Path> {
        self.archive_tmp_dir.as_deref()
    }

    pub fn tar_file(&self) -> Option<&Path> {
        self.tar_file.as_deref()
    }

    /// Record a package produced outside the archive, e.g. by the cleaner
    pub fn set_tar_file(&mut self, path: PathBuf) {
        self.tar_file = Some(path);
    }

    /// Absolute location of an archive-relative path
    pub fn full_archive_path(&self, path: &str) -> PathBuf {
        self.archive_dir.join(path.trim_start_matches('/'))
    }

    /// Write a metadata blob to an archive-relative path
    pub fn add_metadata(&self, content: &str, meta_path: &str) -> Result<()> {
        let path = self.full_archive_path(meta_path);
        write_with_parents(&path, content.as_bytes())
            .context(format!("Failed to write metadata to {}", path.display()))
    }

    /// Collect one item into the archive.
    ///
    /// Returns whether anything was written. An item whose path is already
    /// present is not collected twice.
    pub fn add_to_archive(&self, item: &dyn Collectable) -> Result<bool, CollectError> {
        let path = self.full_archive_path(&item.archive_path());
        if path.exists() {
            debug!("Already collected {}", path.display());
            return Ok(false);
        }

        match item.get_output()? {
            Some(content) => {
                write_with_parents(&path, &content).map_err(|e| CollectError::io(&path, e))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Package the working directory into `<name>.tar<ext>`.
    ///
    /// Returns `Ok(None)` when the selected compressor is not installed.
    pub fn create_tar_file(&mut self) -> Result<Option<PathBuf>> {
        let Some(archive_tmp_dir) = &self.archive_tmp_dir else {
            bail!("Archive packaging directory not defined");
        };

        let tar_file = archive_tmp_dir.join(format!(
            "{}.tar{}",
            self.archive_name,
            self.compressor.extension()
        ));
        debug!("Tar File: {}", tar_file.display());

        let output = Command::new("tar")
            .arg(format!("c{}fS", self.compressor.tar_flag()))
            .arg(&tar_file)
            .arg("-C")
            .arg(&self.tmp_dir)
            .arg(".")
            .output()
            .context("Failed to run tar")?;

        if !output.status.success() {
            if self.compressor.needs_external_binary() {
                error!(
                    "ERROR: {} compressor is not installed, cannot compress file",
                    self.compressor
                );
                return Ok(None);
            }
            debug!("tar exited with {}: {}", output.status, String::from_utf8_lossy(&output.stderr));
        }

        self.delete_archive_dir();
        if let Ok(metadata) = fs::metadata(&tar_file) {
            debug!("Tar File Size: {}", metadata.len());
        }

        self.tar_file = Some(tar_file.clone());
        Ok(Some(tar_file))
    }

    /// Remove scratch directories, honouring `keep_archive`.
    ///
    /// Safe to call any number of times.
    pub fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;

        if let (true, Some(tar_file)) = (self.keep_archive, &self.tar_file) {
            if self.no_upload {
                info!("Archive saved at {}", tar_file.display());
            } else {
                info!("Insights archive retained in {}", tar_file.display());
            }
            if self.obfuscate {
                return;
            }
        } else if let Some(archive_tmp_dir) = &self.archive_tmp_dir {
            remove_dir_quietly(archive_tmp_dir);
        }

        remove_dir_quietly(&self.tmp_dir);
    }

    fn delete_archive_dir(&self) {
        remove_dir_quietly(&self.archive_dir);
    }
}

impl Drop for Archive {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn archive_name() -> String {
    let timestamp = Local::now().format("%Y%m%d%H%M%S");
    match hostname::get() {
        Ok(name) if !name.is_empty() => format!("insights-{}-{}", name.to_string_lossy(), timestamp),
        _ => format!("{}-{}", DEFAULT_ARCHIVE_NAME, timestamp),
    }
}

fn create_private_dir(base: &Path) -> Result<PathBuf> {
    let path = base.join(Uuid::new_v4().simple().to_string());
    DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(&path)
        .context(format!("Failed to create temporary directory under {}", base.display()))?;
    Ok(path)
}

fn write_with_parents(path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

fn remove_dir_quietly(path: &Path) {
    debug!("Deleting: {}", path.display());
    match fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => debug!("Could not delete {}: {}", path.display(), e),
    }
}
