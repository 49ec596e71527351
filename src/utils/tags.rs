use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::constants::APP_NAME;

/// One flattened host tag as written to `/tags.json`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Tag {
    pub key: String,
    pub value: serde_json::Value,
    pub namespace: String,
}

/// Read the operator tags file.
///
/// Returns `Ok(None)` when the file does not exist. The document must be a
/// mapping.
pub fn load_tags(path: &Path) -> Result<Option<Value>> {
    if !path.is_file() {
        debug!("Tags file {} does not exist", path.display());
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .context(format!("Failed to read tags file: {}", path.display()))?;
    let tags: Value = serde_yaml::from_str(&content)
        .context(format!("Failed to parse tags file: {}", path.display()))?;

    match tags {
        Value::Mapping(_) => Ok(Some(tags)),
        Value::Null => Ok(Some(Value::Mapping(Default::default()))),
        _ => bail!("Tags file {} must contain a mapping", path.display()),
    }
}

/// Flatten a tag document into `{key, value, namespace}` entries.
///
/// Nested mappings join their keys with `:` and sequences produce one entry
/// per element under the same key.
pub fn flatten_tags(tags: &Value) -> Result<Vec<Tag>> {
    let mut flattened = Vec::new();
    if let Value::Mapping(map) = tags {
        for (key, value) in map {
            flatten_into(&key_to_string(key), value, &mut flattened)?;
        }
    }
    Ok(flattened)
}

fn flatten_into(key: &str, value: &Value, out: &mut Vec<Tag>) -> Result<()> {
    match value {
        Value::Sequence(items) => {
            for item in items {
                flatten_into(key, item, out)?;
            }
        }
        Value::Mapping(map) => {
            for (sub_key, sub_value) in map {
                let joined = format!("{}:{}", key, key_to_string(sub_key));
                flatten_into(&joined, sub_value, out)?;
            }
        }
        Value::Tagged(tagged) => flatten_into(key, &tagged.value, out)?,
        leaf => out.push(Tag {
            key: key.to_string(),
            value: serde_json::to_value(leaf).context("Tag value is not representable as JSON")?,
            namespace: APP_NAME.to_string(),
        }),
    }
    Ok(())
}

fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
