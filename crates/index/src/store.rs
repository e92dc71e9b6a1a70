use anyhow::Result;
use async_trait::async_trait;
use extract::{Edge, Entity};
use serde::Serialize;
use std::sync::Arc;

/// Graph database seen by the loader.
///
/// Both upserts are merges: replaying a batch never duplicates nodes or
/// relationships.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Uniqueness of `Entity.id`. Safe to call repeatedly.
    async fn ensure_constraints(&self) -> Result<()>;

    /// Create or update one node per entity id. Returns nodes written.
    async fn upsert_nodes(&self, batch: &[Entity]) -> Result<usize>;

    /// Merge one `CO_OCCURS` relationship per edge whose endpoints both
    /// exist. Returns how many edges attached; the rest are silently
    /// dropped by the store.
    async fn upsert_edges(&self, batch: &[Edge]) -> Result<usize>;

    async fn stats(&self) -> Result<GraphStats>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GraphStats {
    pub entity_count: usize,
    pub relation_count: usize,
}

#[async_trait]
impl<T: GraphStore + ?Sized> GraphStore for Arc<T> {
    async fn ensure_constraints(&self) -> Result<()> {
        (**self).ensure_constraints().await
    }

    async fn upsert_nodes(&self, batch: &[Entity]) -> Result<usize> {
        (**self).upsert_nodes(batch).await
    }

    async fn upsert_edges(&self, batch: &[Edge]) -> Result<usize> {
        (**self).upsert_edges(batch).await
    }

    async fn stats(&self) -> Result<GraphStats> {
        (**self).stats().await
    }
}
