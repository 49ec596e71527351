use std::fs;
use std::path::Path;

use log::{debug, warn};
use regex::Regex;

/// Expand a catalog path whose file name is a pattern.
///
/// The parent directory is listed and every entry whose name matches the
/// final component, read as a regular expression anchored at the start, is
/// returned. A missing directory or an invalid pattern yields nothing.
pub fn expand_paths(path: &str) -> Vec<String> {
    debug!("Attempting to expand {}", path);

    let path = Path::new(path);
    let (Some(dir), Some(pattern)) = (path.parent(), path.file_name()) else {
        debug!("Could not expand {}", path.display());
        return Vec::new();
    };
    if !dir.is_dir() {
        debug!("Could not expand {}", path.display());
        return Vec::new();
    }

    let matcher = match Regex::new(&format!("^(?:{})", pattern.to_string_lossy())) {
        Ok(matcher) => matcher,
        Err(e) => {
            debug!("Invalid pattern in {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| matcher.is_match(name))
            .collect(),
        Err(e) => {
            debug!("Could not list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };
    names.sort();

    let expanded: Vec<String> = names
        .iter()
        .map(|name| dir.join(name).to_string_lossy().to_string())
        .collect();
    debug!("Expanded paths {:?}", expanded);
    expanded
}

/// Expand a shell-style glob against the host filesystem
pub fn expand_glob(pattern: &str) -> Vec<String> {
    match glob::glob(pattern) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|path| path.to_string_lossy().to_string())
            .collect(),
        Err(e) => {
            warn!("Failed to glob {}: {}", pattern, e);
            Vec::new()
        }
    }
}
