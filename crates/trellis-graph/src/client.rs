//! Neo4j connection client.

use anyhow::{Context, Result};
use neo4rs::{ConfigBuilder, Graph, Query};
use serde::Deserialize;

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "trellis_dev".to_string(),
            database: "neo4j".to_string(),
        }
    }
}

/// Client for graph store operations.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Create a new GraphClient from config.
    ///
    /// Note: neo4rs uses a lazy deadpool — `Graph::connect` only creates the
    /// pool object and does NOT establish a real bolt connection yet.  We run
    /// a cheap `RETURN 1` ping immediately so that callers can wrap this in a
    /// timeout and get a fast failure when Neo4j is unreachable instead of
    /// hanging silently.
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        let neo4j_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .db(config.database.as_str())
            .max_connections(4)
            .fetch_size(50)
            .build()
            .context("Failed to build Neo4j config")?;

        let graph = Graph::connect(neo4j_config)
            .await
            .context("Failed to create Neo4j connection pool")?;

        // Ping to force an actual TCP+bolt handshake so the caller's timeout works.
        graph
            .run(Query::new("RETURN 1".to_string()))
            .await
            .context("Neo4j is not responding to queries")?;

        Ok(Self { graph })
    }

    /// Create a new GraphClient with default configuration.
    pub async fn connect_default() -> Result<Self> {
        Self::connect(&GraphConfig::default()).await
    }

    /// Execute a Cypher query that returns no results.
    pub async fn execute(&self, query: Query) -> Result<()> {
        self.graph
            .run(query)
            .await
            .context("Neo4j query execution failed")?;
        Ok(())
    }

    /// Execute a Cypher query and return results as rows.
    pub async fn query(&self, query: Query) -> Result<Vec<neo4rs::Row>> {
        let mut result = self
            .graph
            .execute(query)
            .await
            .context("Neo4j query failed")?;

        let mut rows = Vec::new();
        while let Ok(Some(row)) = result.next().await {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Get a reference to the underlying neo4rs Graph.
    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}
