//! Single-item collectors.
//!
//! Each catalog entry that survives filtering becomes a [`Collectable`]
//! which the archive asks for its output and its location inside the
//! archive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use log::debug;

#[cfg(test)]
use mockall::automock;

use super::error::CollectError;
use crate::constants::COMMANDS_DIR;
use crate::models::CommandSpec;
use crate::utils::mangle::mangle_command;

/// One item that can be stored in the archive
#[cfg_attr(test, automock)]
pub trait Collectable {
    /// Archive-relative path the output is stored under
    fn archive_path(&self) -> String;

    /// Produce the item's content. `Ok(None)` means there is nothing to
    /// store, which is not an error.
    fn get_output(&self) -> Result<Option<Vec<u8>>, CollectError>;
}

/// Exit status and output of a finished process, stdout first, then stderr
#[derive(Debug)]
pub struct CombinedOutput {
    pub status: ExitStatus,
    pub output: Vec<u8>,
}

/// Run `command` to completion and capture stdout followed by stderr
pub fn run_with_combined_output(command: &mut Command) -> io::Result<CombinedOutput> {
    let output = command.output()?;

    let mut combined = output.stdout;
    combined.extend_from_slice(&output.stderr);

    Ok(CombinedOutput {
        status: output.status,
        output: combined,
    })
}

/// Runs one command without a shell
#[derive(Debug, Clone)]
pub struct CommandCollector {
    spec: CommandSpec,
}

impl CommandCollector {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }

    pub fn command(&self) -> &str {
        &self.spec.command
    }
}

impl Collectable for CommandCollector {
    fn archive_path(&self) -> String {
        format!("{}/{}", COMMANDS_DIR, mangle_command(&self.spec.command))
    }

    fn get_output(&self) -> Result<Option<Vec<u8>>, CollectError> {
        let command = &self.spec.command;
        let argv = shlex::split(command)
            .filter(|argv| !argv.is_empty())
            .ok_or_else(|| CollectError::Tokenize { command: command.clone() })?;

        debug!("Executing: {:?}", argv);
        let result = run_with_combined_output(Command::new(&argv[0]).args(&argv[1..]))
            .map_err(|source| CollectError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(CollectError::ExitStatus {
                command: command.clone(),
                code: result.status.code(),
            });
        }
        Ok(Some(result.output))
    }
}

/// Copies one file from the collected filesystem
#[derive(Debug, Clone)]
pub struct FileCollector {
    file: String,
    mountpoint: PathBuf,
}

impl FileCollector {
    pub fn new(file: &str, mountpoint: &Path) -> Self {
        Self {
            file: file.to_string(),
            mountpoint: mountpoint.to_path_buf(),
        }
    }

    /// Location of the file on the collected filesystem
    pub fn source_path(&self) -> PathBuf {
        self.mountpoint.join(self.file.trim_start_matches('/'))
    }
}

impl Collectable for FileCollector {
    fn archive_path(&self) -> String {
        self.file.trim_start_matches('/').to_string()
    }

    fn get_output(&self) -> Result<Option<Vec<u8>>, CollectError> {
        let source = self.source_path();
        if !source.is_file() {
            debug!("File {} does not exist", source.display());
            return Ok(None);
        }

        fs::read(&source)
            .map(Some)
            .map_err(|e| CollectError::io(source, e))
    }
}
