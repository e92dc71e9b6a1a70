use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use crate::normalizer::AliasSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub level: usize,
    pub content: String,
}

impl Section {
    pub fn new(title: String, level: usize, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            level: level.max(1),
            content,
        }
    }
}

/// Normalized, sectioned form of a batch of source documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeepDocument {
    pub title: String,
    /// In document order.
    pub sections: Vec<Section>,
    /// Lower-cased term -> short definition.
    pub dictionary: BTreeMap<String, String>,
    /// Citation strings, unique, in first-seen order. Entry `n - 1` is `[n]`.
    pub bibliography: Vec<String>,
}

impl DeepDocument {
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize deep document")?;
        tokio::fs::write(path, json)
            .await
            .context(format!("Failed to write deep document: {:?}", path))?;
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .context(format!("Failed to read deep document: {:?}", path))?;
        serde_json::from_str(&json).context("Failed to parse deep document")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub section_id: String,
}

/// Co-occurrence of two entities inside one scoping unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub section_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub entities: Vec<Entity>,
    pub edges: Vec<Edge>,
    pub aliases: AliasSet,
    /// Entities carry a type label (linguistic policy).
    pub labelled: bool,
}
