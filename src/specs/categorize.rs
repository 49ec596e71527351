use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared data-source descriptors, one variant per kind the catalog knows.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSource {
    SimpleFile { path: String },
    /// First existing path out of several candidates
    FirstFile { paths: Vec<String> },
    GlobFile { patterns: Vec<String> },
    /// Path template filled in once per item
    ForeachCollect { path: String },
    SimpleCommand { cmd: String },
    CommandWithArgs { cmd: String },
    /// Command template run once per item
    ForeachExecute { cmd: String },
    /// Derived from other data sources (first-of, head, find, listdir or
    /// code-defined); its concrete command or path is unknown until its
    /// dependencies run.
    Composite { name: String },
}

/// Reporting bucket of a data source
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    FileStatic,
    FileGlob,
    FileTemplate,
    CommandStatic,
    CommandTemplate,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::FileStatic => write!(f, "file_static"),
            Category::FileGlob => write!(f, "file_glob"),
            Category::FileTemplate => write!(f, "file_template"),
            Category::CommandStatic => write!(f, "command_static"),
            Category::CommandTemplate => write!(f, "command_template"),
        }
    }
}

/// Category and literal strings of one data source.
///
/// Composite sources return `None`: whatever they depend on is resolved on
/// its own.
pub fn resolve(source: &DataSource) -> Option<(Category, Vec<String>)> {
    match source {
        DataSource::SimpleFile { path } => Some((Category::FileStatic, vec![path.clone()])),
        DataSource::FirstFile { paths } => Some((Category::FileStatic, paths.clone())),
        DataSource::GlobFile { patterns } => Some((Category::FileGlob, patterns.clone())),
        DataSource::ForeachCollect { path } => Some((Category::FileTemplate, vec![path.clone()])),
        DataSource::SimpleCommand { cmd } => Some((Category::CommandStatic, vec![cmd.clone()])),
        DataSource::CommandWithArgs { cmd } | DataSource::ForeachExecute { cmd } => {
            Some((Category::CommandTemplate, vec![cmd.clone()]))
        }
        DataSource::Composite { .. } => None,
    }
}

/// Group the commands, paths and templates of `sources` by category.
///
/// Each bucket is sorted and deduplicated so reports diff cleanly.
pub fn categorize<'a, I>(sources: I) -> BTreeMap<Category, Vec<String>>
where
    I: IntoIterator<Item = &'a DataSource>,
{
    let mut results: BTreeMap<Category, BTreeSet<String>> = BTreeMap::new();
    for source in sources {
        if let Some((category, values)) = resolve(source) {
            results.entry(category).or_default().extend(values);
        }
    }

    results
        .into_iter()
        .map(|(category, values)| (category, values.into_iter().collect()))
        .collect()
}
