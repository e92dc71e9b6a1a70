use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Normalize a surface form into an entity key: trimmed, lower-cased,
/// inner whitespace collapsed to single spaces.
pub fn normalize_key(surface: &str) -> String {
    surface
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Every surface variant observed for each normalized key.
///
/// Only ever grows: there is no removal API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasSet {
    aliases: BTreeMap<String, BTreeSet<String>>,
}

impl AliasSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a surface form and return its normalized key.
    pub fn record(&mut self, surface: &str) -> String {
        let key = normalize_key(surface);
        self.aliases
            .entry(key.clone())
            .or_default()
            .insert(surface.trim().to_string());
        key
    }

    pub fn variants(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.aliases.get(key)
    }

    pub fn merge(&mut self, other: AliasSet) {
        for (key, variants) in other.aliases {
            self.aliases.entry(key).or_default().extend(variants);
        }
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
