use anyhow::Result;
use async_trait::async_trait;
use extract::{Edge, Entity};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

use crate::store::{GraphStats, GraphStore};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredNode {
    pub name: String,
    pub label: Option<String>,
}

#[derive(Default)]
struct MemoryGraph {
    nodes: HashMap<String, StoredNode>,
    relationships: HashSet<(String, String, String)>,
    constrained: bool,
}

/// In-process graph with the same merge semantics as the Neo4j store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryGraph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn node(&self, id: &str) -> Option<StoredNode> {
        self.inner.lock().await.nodes.get(id).cloned()
    }

    pub async fn has_relationship(&self, source: &str, target: &str, section_id: &str) -> bool {
        self.inner.lock().await.relationships.contains(&(
            source.to_string(),
            target.to_string(),
            section_id.to_string(),
        ))
    }

    pub async fn is_constrained(&self) -> bool {
        self.inner.lock().await.constrained
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn ensure_constraints(&self) -> Result<()> {
        self.inner.lock().await.constrained = true;
        Ok(())
    }

    async fn upsert_nodes(&self, batch: &[Entity]) -> Result<usize> {
        let mut graph = self.inner.lock().await;
        for entity in batch {
            graph.nodes.insert(
                entity.id.clone(),
                StoredNode {
                    name: entity.name.clone(),
                    label: entity.label.clone(),
                },
            );
        }
        Ok(batch.len())
    }

    async fn upsert_edges(&self, batch: &[Edge]) -> Result<usize> {
        let mut graph = self.inner.lock().await;
        let mut attached = 0;

        for edge in batch {
            if !graph.nodes.contains_key(&edge.source) || !graph.nodes.contains_key(&edge.target) {
                continue;
            }
            graph.relationships.insert((
                edge.source.clone(),
                edge.target.clone(),
                edge.section_id.clone(),
            ));
            attached += 1;
        }

        Ok(attached)
    }

    async fn stats(&self) -> Result<GraphStats> {
        let graph = self.inner.lock().await;
        Ok(GraphStats {
            entity_count: graph.nodes.len(),
            relation_count: graph.relationships.len(),
        })
    }
}
