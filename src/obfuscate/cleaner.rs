use std::collections::HashMap;
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::{Captures, Regex};
use walkdir::WalkDir;

use super::{CleanOptions, CleanReport, Scrubber};
use crate::constants::OBFUSCATED_IP_PREFIX;
use crate::utils::hash::hash_hostname;

lazy_static! {
    static ref IPV4: Regex = Regex::new(
        r"\b(?:(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9]?[0-9])\b"
    )
    .unwrap();
    static ref OBFUSCATED_BASE: u32 =
        u32::from(format!("{}.0", OBFUSCATED_IP_PREFIX).parse::<Ipv4Addr>().unwrap());
}

/// Built-in scrubbing engine.
///
/// Rewrites every text file of a report, replacing IPv4 addresses with
/// stable addresses from a private range, the hostname with its hashed
/// form and each keyword with `keywordN`. Binary files are copied as-is.
#[derive(Debug, Default)]
pub struct ReportCleaner {
    ip_map: HashMap<String, String>,
    ip_order: Vec<String>,
    keywords: Vec<(String, String)>,
    hostnames: Vec<(String, String)>,
    replacements: HashMap<String, String>,
    terms: Option<Regex>,
}

impl ReportCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replacement address for `original`, allocated on first sight
    fn obfuscate_ip(&mut self, original: &str) -> String {
        if original.starts_with("127.") || original == "0.0.0.0" {
            return original.to_string();
        }
        if let Some(fake) = self.ip_map.get(original) {
            return fake.clone();
        }

        let offset = self.ip_order.len() as u32 + 1;
        let fake = Ipv4Addr::from(*OBFUSCATED_BASE + offset).to_string();
        self.ip_map.insert(original.to_string(), fake.clone());
        self.ip_order.push(original.to_string());
        fake
    }

    fn scrub_text(&mut self, text: &str) -> String {
        let result = match &self.terms {
            Some(terms) => terms
                .replace_all(text, |caps: &Captures| {
                    self.replacements
                        .get(&caps[0])
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .to_string(),
            None => text.to_string(),
        };

        IPV4.replace_all(&result, |caps: &Captures| self.obfuscate_ip(&caps[0]))
            .to_string()
    }

    /// Rebuild the single-pass matcher over every hostname and keyword.
    ///
    /// Longer terms come first so a full hostname wins over its short form.
    /// A term only matches as a whole word, and replacements are never
    /// scanned again.
    fn rebuild_terms(&mut self) -> Result<()> {
        self.replacements.clear();
        for (original, replacement) in self.hostnames.iter().chain(self.keywords.iter()) {
            self.replacements
                .entry(original.clone())
                .or_insert_with(|| replacement.clone());
        }

        let mut originals: Vec<&String> = self.replacements.keys().collect();
        if originals.is_empty() {
            self.terms = None;
            return Ok(());
        }
        originals.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let alternation = originals
            .iter()
            .map(|term| whole_word(term))
            .collect::<Vec<_>>()
            .join("|");
        self.terms = Some(Regex::new(&alternation).context("Failed to build scrubbing pattern")?);
        Ok(())
    }

    fn load_hostname(&mut self, archive_dir: &Path, hostname_path: &str) -> Option<String> {
        let path = archive_dir.join(hostname_path.trim_start_matches('/'));
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read hostname from {}: {}", path.display(), e);
                return None;
            }
        };

        let fqdn = content.lines().next()?.trim().to_string();
        if fqdn.is_empty() {
            return None;
        }

        let hashed = hash_hostname(&fqdn);
        self.hostnames.push((fqdn.clone(), hashed.clone()));
        if let Some((short, _)) = fqdn.split_once('.').filter(|(short, _)| !short.is_empty()) {
            let short_hashed = hashed.split('.').next().unwrap_or_default().to_string();
            self.hostnames.push((short.to_string(), short_hashed));
        }
        if let Err(e) = self.rebuild_terms() {
            warn!("Hostname will not be obfuscated: {:#}", e);
        }
        Some(hashed)
    }

    fn load_keywords(&mut self, keyword_file: &Path) -> Result<()> {
        let content = fs::read_to_string(keyword_file)
            .context(format!("Failed to read keyword file: {}", keyword_file.display()))?;

        for keyword in content.lines().map(str::trim).filter(|k| !k.is_empty()) {
            let replacement = format!("keyword{}", self.keywords.len());
            self.keywords.push((keyword.to_string(), replacement));
        }
        debug!("Loaded {} keywords", self.keywords.len());
        self.rebuild_terms()
    }

    fn clean_tree(&mut self, source: &Path, target: &Path) -> Result<usize> {
        let mut cleaned = 0;
        for entry in WalkDir::new(source).follow_links(false) {
            let entry = entry.context("Failed to walk report directory")?;
            let relative = entry.path().strip_prefix(source)?;
            let destination = target.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&destination)
                    .context(format!("Failed to create {}", destination.display()))?;
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }

            let content = fs::read(entry.path())
                .context(format!("Failed to read {}", entry.path().display()))?;
            let output = match String::from_utf8(content) {
                Ok(text) => {
                    cleaned += 1;
                    self.scrub_text(&text).into_bytes()
                }
                Err(e) => e.into_bytes(),
            };
            fs::write(&destination, output)
                .context(format!("Failed to write {}", destination.display()))?;
        }
        Ok(cleaned)
    }

    fn write_ip_report(&self, path: &Path) -> Result<()> {
        let mut report = String::from("original,obfuscated\n");
        for original in &self.ip_order {
            report.push_str(&format!("{},{}\n", original, self.ip_map[original]));
        }
        fs::write(path, report).context(format!("Failed to write IP report: {}", path.display()))
    }
}

impl Scrubber for ReportCleaner {
    fn clean_report(&mut self, options: &CleanOptions, archive_dir: &Path) -> Result<CleanReport> {
        let name = archive_dir
            .file_name()
            .map(|n| format!("{}-obfuscated", n.to_string_lossy()))
            .context("Report directory has no name")?;

        let hashed_fqdn = match &options.hostname_path {
            Some(hostname_path) => self.load_hostname(archive_dir, hostname_path),
            None => None,
        };
        if let Some(keyword_file) = options.keyword_path() {
            self.load_keywords(keyword_file)?;
        }

        let dir_path = options.report_dir.join(&name);
        let cleaned = self.clean_tree(archive_dir, &dir_path)?;
        info!("Obfuscated {} files, {} IP addresses", cleaned, self.ip_order.len());

        let ip_report = options.report_dir.join(format!("{}-ip.csv", name));
        self.write_ip_report(&ip_report)?;

        let archive_path = if options.no_tar_file {
            None
        } else {
            Some(package(&options.report_dir, &name)?)
        };

        Ok(CleanReport {
            dir_path,
            archive_path,
            hashed_fqdn,
            ip_report,
        })
    }
}

/// Escaped `term`, anchored at word boundaries on its word-character ends
fn whole_word(term: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let start = if term.starts_with(is_word) { r"\b" } else { "" };
    let end = if term.ends_with(is_word) { r"\b" } else { "" };
    format!("{}{}{}", start, regex::escape(term), end)
}

fn package(report_dir: &Path, name: &str) -> Result<PathBuf> {
    let tar_file = report_dir.join(format!("{}.tar.gz", name));
    let status = Command::new("tar")
        .arg("czfS")
        .arg(&tar_file)
        .arg("-C")
        .arg(report_dir)
        .arg(name)
        .status()
        .context("Failed to run tar")?;

    if !status.success() {
        bail!("tar exited with {} while packaging {}", status, name);
    }
    Ok(tar_file)
}
