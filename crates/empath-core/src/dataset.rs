//! Scenario dataset and character table loading.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};
use serde_json::Value;

use crate::model::ScenarioRecord;

/// Decode bytes as UTF-8 (BOM tolerated), falling back to Latin-1.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&decode_text(&bytes))
        .with_context(|| format!("failed to parse JSON {}", path.display()))
}

/// Scenarios in dataset order. A top-level object is unwrapped to its
/// first array value (`{"data": [...]}`).
pub fn load_scenarios(path: &Path) -> anyhow::Result<Vec<ScenarioRecord>> {
    let value = read_json(path)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.into_iter().find_map(|(_, v)| match v {
            Value::Array(items) => Some(items),
            _ => None,
        }) {
            Some(items) => items,
            None => bail!("{}: expected a list of scenarios", path.display()),
        },
        _ => bail!("{}: expected a list of scenarios", path.display()),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item)
                .with_context(|| format!("{}: invalid scenario at index {}", path.display(), i))
        })
        .collect()
}

/// Character profiles keyed by `character_id`.
#[derive(Debug, Clone, Default)]
pub struct CharacterTable(HashMap<String, Value>);

impl CharacterTable {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match read_json(path)? {
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            _ => bail!("{}: expected an object keyed by character id", path.display()),
        }
    }

    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Prompt rendering of one profile: strings verbatim, other JSON compact.
    pub fn render(&self, character_id: &str) -> Option<String> {
        self.0.get(character_id).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
