pub mod memory_store;
pub mod neo4j_store;
pub mod store;

pub use memory_store::MemoryStore;
pub use neo4j_store::{GraphConfig, Neo4jStore};
pub use store::{GraphStats, GraphStore};

use anyhow::Result;
use extract::export::{read_edges_csv, read_entities_csv, ExtractionArtifacts};
use extract::{Edge, Entity};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub batch_size: usize,
    /// Turn edges with missing endpoints into an error instead of a count.
    pub fail_on_missing_endpoints: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            fail_on_missing_endpoints: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub nodes_submitted: usize,
    pub nodes_written: usize,
    pub node_batches: usize,
    pub edges_submitted: usize,
    pub edges_attached: usize,
    pub edges_skipped: usize,
    pub edge_batches: usize,
}

/// Batched upsert of extracted entities and edges into a graph store.
pub struct GraphLoader<S> {
    store: S,
    config: LoaderConfig,
}

impl<S: GraphStore> GraphLoader<S> {
    pub fn new(store: S, config: LoaderConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Constraint first, then every node batch, then every edge batch:
    /// edges only attach to nodes that already exist.
    pub async fn load(&self, entities: &[Entity], edges: &[Edge]) -> Result<LoadReport> {
        let batch_size = self.config.batch_size.max(1);
        let mut report = LoadReport {
            nodes_submitted: entities.len(),
            edges_submitted: edges.len(),
            ..Default::default()
        };

        self.store.ensure_constraints().await?;

        for batch in entities.chunks(batch_size) {
            report.nodes_written += self.store.upsert_nodes(batch).await?;
            report.node_batches += 1;
        }

        for batch in edges.chunks(batch_size) {
            let attached = self.store.upsert_edges(batch).await?;
            report.edges_attached += attached;
            report.edges_skipped += batch.len().saturating_sub(attached);
            report.edge_batches += 1;
        }

        if report.edges_skipped > 0 {
            warn!(
                skipped = report.edges_skipped,
                "Edges referenced entities that are not in the graph"
            );
            if self.config.fail_on_missing_endpoints {
                anyhow::bail!(
                    "{} of {} edges reference missing entities",
                    report.edges_skipped,
                    report.edges_submitted
                );
            }
        }

        info!(
            nodes = report.nodes_written,
            node_batches = report.node_batches,
            edges = report.edges_attached,
            edge_batches = report.edge_batches,
            skipped = report.edges_skipped,
            "Graph load finished"
        );

        Ok(report)
    }

    /// Load `entities.csv` and `edges.csv` from an artifact directory.
    pub async fn load_artifacts(&self, dir: &Path) -> Result<LoadReport> {
        let artifacts = ExtractionArtifacts::in_dir(dir);
        let entities = read_entities_csv(&artifacts.entities)?;
        let edges = read_edges_csv(&artifacts.edges)?;

        self.load(&entities, &edges).await
    }

    pub async fn get_stats(&self) -> Result<GraphStats> {
        self.store.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn entity(id: &str) -> Entity {
        Entity {
            id: id.into(),
            name: id.into(),
            label: None,
            section_id: "s-1".into(),
        }
    }

    fn edge(source: &str, target: &str, section_id: &str) -> Edge {
        Edge {
            source: source.into(),
            target: target.into(),
            section_id: section_id.into(),
        }
    }

    #[tokio::test]
    async fn test_reloading_is_idempotent() {
        let loader = GraphLoader::new(MemoryStore::new(), LoaderConfig::default());
        let entities = vec![entity("alpha"), entity("gamma"), entity("delta"), entity("alpha")];
        let edges = vec![edge("alpha", "gamma", "s-1"), edge("gamma", "delta", "s-1")];

        loader.load(&entities, &edges).await.unwrap();
        loader.load(&entities, &edges).await.unwrap();

        let stats = loader.get_stats().await.unwrap();
        assert_eq!(stats.entity_count, 3);
        assert_eq!(stats.relation_count, 2);
        assert!(loader.store().is_constrained().await);
    }

    #[tokio::test]
    async fn test_same_pair_in_two_sections_is_two_relationships() {
        let loader = GraphLoader::new(MemoryStore::new(), LoaderConfig::default());
        let entities = vec![entity("alpha"), entity("gamma")];
        let edges = vec![edge("alpha", "gamma", "s-1"), edge("alpha", "gamma", "s-2")];

        loader.load(&entities, &edges).await.unwrap();

        assert_eq!(loader.get_stats().await.unwrap().relation_count, 2);
        assert!(loader.store().has_relationship("alpha", "gamma", "s-2").await);
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_counted_not_raised() {
        let loader = GraphLoader::new(MemoryStore::new(), LoaderConfig::default());
        let entities = vec![entity("alpha"), entity("gamma")];
        let edges = vec![edge("alpha", "gamma", "s-1"), edge("alpha", "ghost", "s-1")];

        let report = loader.load(&entities, &edges).await.unwrap();

        assert_eq!(report.edges_attached, 1);
        assert_eq!(report.edges_skipped, 1);
        assert!(!loader.store().has_relationship("alpha", "ghost", "s-1").await);
    }

    #[tokio::test]
    async fn test_fail_loud_on_missing_endpoint() {
        let config = LoaderConfig {
            fail_on_missing_endpoints: true,
            ..Default::default()
        };
        let loader = GraphLoader::new(MemoryStore::new(), config);

        let result = loader.load(&[entity("alpha")], &[edge("alpha", "ghost", "s-1")]).await;

        assert!(result.is_err());
    }

    /// Records the order of calls and batch sizes.
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<String>>,
        nodes: AtomicUsize,
    }

    #[async_trait]
    impl GraphStore for RecordingStore {
        async fn ensure_constraints(&self) -> Result<()> {
            self.calls.lock().unwrap().push("constraint".into());
            Ok(())
        }

        async fn upsert_nodes(&self, batch: &[Entity]) -> Result<usize> {
            self.calls.lock().unwrap().push(format!("nodes:{}", batch.len()));
            self.nodes.fetch_add(batch.len(), Ordering::SeqCst);
            Ok(batch.len())
        }

        async fn upsert_edges(&self, batch: &[Edge]) -> Result<usize> {
            self.calls.lock().unwrap().push(format!("edges:{}", batch.len()));
            Ok(batch.len())
        }

        async fn stats(&self) -> Result<GraphStats> {
            Ok(GraphStats::default())
        }
    }

    #[tokio::test]
    async fn test_batches_and_node_before_edge_ordering() {
        let loader = GraphLoader::new(RecordingStore::default(), LoaderConfig::default());
        let entities: Vec<_> = (0..250).map(|i| entity(&format!("e{}", i))).collect();
        let edges: Vec<_> = (0..120)
            .map(|i| edge(&format!("e{}", i), &format!("e{}", i + 1), "s-1"))
            .collect();

        let report = loader.load(&entities, &edges).await.unwrap();

        let calls = loader.store().calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec!["constraint", "nodes:100", "nodes:100", "nodes:50", "edges:100", "edges:20"]
        );
        assert_eq!(report.node_batches, 3);
        assert_eq!(report.edge_batches, 2);
        assert_eq!(loader.store().nodes.load(Ordering::SeqCst), 250);
    }

    #[tokio::test]
    async fn test_load_artifacts_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ExtractionArtifacts::in_dir(dir.path());
        extract::export::write_entities_csv(&artifacts.entities, &[entity("alpha"), entity("gamma")], false).unwrap();
        extract::export::write_edges_csv(&artifacts.edges, &[edge("alpha", "gamma", "s-1")]).unwrap();

        let loader = GraphLoader::new(MemoryStore::new(), LoaderConfig::default());
        let report = loader.load_artifacts(dir.path()).await.unwrap();

        assert_eq!(report.nodes_written, 2);
        assert_eq!(report.edges_attached, 1);
    }
}
