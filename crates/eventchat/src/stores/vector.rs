use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Ranked nearest-neighbor results, one inner list per query embedding.
///
/// The optional columns mirror what the vector store returns: any of them may be
/// missing or shorter than `ids` when the response is malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub ids: Vec<Vec<String>>,
    #[serde(default)]
    pub metadatas: Option<Vec<Option<Vec<Option<Map<String, Value>>>>>>,
    #[serde(default)]
    pub distances: Option<Vec<Option<Vec<Option<f32>>>>>,
}

/// A record to add to the vector store
#[derive(Debug, Clone, PartialEq)]
pub struct EventVector {
    pub id: String,
    pub embedding: Vec<f32>,
    pub metadata: Map<String, Value>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The `k` nearest stored vectors to `embedding`, closest first
    async fn query(&self, embedding: &[f32], k: usize) -> Result<QueryResult>;

    /// Ids of every record already stored
    async fn existing_ids(&self) -> Result<HashSet<String>>;

    async fn add(&self, records: Vec<EventVector>) -> Result<()>;
}
