use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use extract::{Edge, Entity, RetryPolicy};
use neo4rs::{Graph, Query};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::store::{GraphStats, GraphStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub timeout_secs: u64,
}

pub struct Neo4jStore {
    graph: Graph,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Neo4jStore {
    pub fn new(graph: Graph, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            graph,
            timeout,
            retry,
        }
    }

    pub async fn connect(config: &GraphConfig, retry: RetryPolicy) -> Result<Self> {
        let wait = Duration::from_secs(config.timeout_secs);

        let graph = retry
            .retry("neo4j.connect", || async {
                timeout(
                    wait,
                    Graph::new(config.uri.as_str(), config.user.as_str(), config.password.as_str()),
                )
                .await
                .map_err(|_| anyhow!("Connecting to Neo4j timed out after {:?}", wait))?
                .context(format!("Failed to connect to Neo4j at {}", config.uri))
            })
            .await?;

        info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self::new(graph, wait, retry))
    }

    /// Run one statement under the store timeout.
    async fn bounded<T, F>(&self, operation: &str, statement: F) -> Result<T>
    where
        F: Future<Output = Result<T, neo4rs::Error>>,
    {
        timeout(self.timeout, statement)
            .await
            .map_err(|_| anyhow!("Neo4j {} timed out after {:?}", operation, self.timeout))?
            .context(format!("Neo4j {} failed", operation))
    }

    async fn count(&self, operation: &str, cypher: &str) -> Result<usize> {
        self.bounded(operation, async {
            let mut result = self.graph.execute(Query::new(cypher.to_string())).await?;
            let count = match result.next().await? {
                Some(row) => row.get::<i64>("count").unwrap_or(0),
                None => 0,
            };
            Ok::<_, neo4rs::Error>(count as usize)
        })
        .await
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn ensure_constraints(&self) -> Result<()> {
        self.retry
            .retry("neo4j.ensure_constraints", || async {
                let query = Query::new(
                    "CREATE CONSTRAINT entity_id_unique IF NOT EXISTS FOR (e:Entity) REQUIRE e.id IS UNIQUE"
                        .to_string(),
                );
                self.bounded("constraint", self.graph.run(query)).await
            })
            .await?;

        info!("Neo4j uniqueness constraint on Entity.id ensured");
        Ok(())
    }

    async fn upsert_nodes(&self, batch: &[Entity]) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = batch.iter().map(|e| e.id.clone()).collect();
        let names: Vec<String> = batch.iter().map(|e| e.name.clone()).collect();
        let labels: Vec<String> = batch
            .iter()
            .map(|e| e.label.clone().unwrap_or_default())
            .collect();

        self.retry
            .retry("neo4j.upsert_nodes", || async {
                let query = Query::new(
                    r#"
                    UNWIND range(0, size($ids) - 1) AS i
                    MERGE (e:Entity {id: $ids[i]})
                    SET e.name = $names[i],
                        e.label = CASE WHEN $labels[i] = '' THEN null ELSE $labels[i] END
                    "#
                    .to_string(),
                )
                .param("ids", ids.clone())
                .param("names", names.clone())
                .param("labels", labels.clone());

                self.bounded("node upsert", self.graph.run(query)).await
            })
            .await?;

        debug!(nodes = batch.len(), "Upserted node batch");
        Ok(batch.len())
    }

    async fn upsert_edges(&self, batch: &[Edge]) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let sources: Vec<String> = batch.iter().map(|e| e.source.clone()).collect();
        let targets: Vec<String> = batch.iter().map(|e| e.target.clone()).collect();
        let sections: Vec<String> = batch.iter().map(|e| e.section_id.clone()).collect();

        // MATCH drops rows whose endpoints are missing, so `attached` counts
        // only the edges that were merged.
        let attached = self
            .retry
            .retry("neo4j.upsert_edges", || async {
                let query = Query::new(
                    r#"
                    UNWIND range(0, size($sources) - 1) AS i
                    MATCH (s:Entity {id: $sources[i]})
                    MATCH (t:Entity {id: $targets[i]})
                    MERGE (s)-[r:CO_OCCURS {section_id: $sections[i]}]->(t)
                    RETURN count(r) AS attached
                    "#
                    .to_string(),
                )
                .param("sources", sources.clone())
                .param("targets", targets.clone())
                .param("sections", sections.clone());

                self.bounded("edge upsert", async {
                    let mut result = self.graph.execute(query).await?;
                    let attached = match result.next().await? {
                        Some(row) => row.get::<i64>("attached").unwrap_or(0),
                        None => 0,
                    };
                    Ok::<_, neo4rs::Error>(attached as usize)
                })
                .await
            })
            .await?;

        debug!(edges = batch.len(), attached, "Upserted edge batch");
        Ok(attached)
    }

    async fn stats(&self) -> Result<GraphStats> {
        let entity_count = self
            .count("entity count", "MATCH (e:Entity) RETURN count(e) as count")
            .await?;
        let relation_count = self
            .count(
                "relationship count",
                "MATCH ()-[r:CO_OCCURS]->() RETURN count(r) as count",
            )
            .await?;

        Ok(GraphStats {
            entity_count,
            relation_count,
        })
    }
}
