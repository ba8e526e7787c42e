use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ToolHandler, ToolInput};
use crate::embeddings::Embedder;
use crate::errors::{AgentError, AgentResult};
use crate::stores::vector::{QueryResult, VectorStore};

/// Number of nearest events returned to the model
pub const SEARCH_RESULTS: usize = 5;

pub const NO_EVENTS_FOUND: &str = "No events found.";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchEventsInput {
    pub query: String,
}

impl ToolInput for SearchEventsInput {
    fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        Ok(())
    }
}

/// Semantic search over the indexed events
pub struct SearchEventsTool {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
}

impl SearchEventsTool {
    pub fn new(embedder: Arc<dyn Embedder>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            vector_store,
        }
    }
}

#[derive(Debug, PartialEq)]
struct SearchHit {
    id: String,
    name: Option<String>,
    category: Option<String>,
    distance: Option<f32>,
}

impl SearchHit {
    fn render(&self) -> String {
        format!(
            "EventId: {}, Name: {}, Category: {}, Score: {}",
            self.id,
            self.name.as_deref().unwrap_or("Unknown"),
            self.category.as_deref().unwrap_or("Unknown"),
            self.distance
                .map(|d| format!("{:.3}", d))
                .unwrap_or_else(|| "N/A".to_string()),
        )
    }
}

/// Pull the hits for the first query out of a store response.
///
/// `None` when the response has no rows or is missing one of the columns.
fn collect_hits(result: QueryResult) -> Option<Vec<SearchHit>> {
    let ids = result.ids.into_iter().next()?;
    let metadatas = result.metadatas?.into_iter().next()??;
    let distances = result.distances?.into_iter().next()??;

    let mut hits: Vec<SearchHit> = ids
        .into_iter()
        .enumerate()
        .map(|(idx, id)| {
            let metadata = metadatas.get(idx).and_then(|m| m.as_ref());
            let field = |key: &str| {
                metadata
                    .and_then(|m| m.get(key))
                    .and_then(|v| v.as_str())
                    .map(String::from)
            };
            SearchHit {
                name: field("Name"),
                category: field("Category"),
                distance: distances.get(idx).copied().flatten(),
                id,
            }
        })
        .collect();

    // Closest first; hits without a distance go last
    hits.sort_by(|a, b| match (a.distance, b.distance) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    hits.truncate(SEARCH_RESULTS);
    Some(hits)
}

#[async_trait]
impl ToolHandler for SearchEventsTool {
    type Input = SearchEventsInput;

    fn name(&self) -> &'static str {
        "searchEvents"
    }

    fn description(&self) -> &'static str {
        "Search for events by name or description using semantic similarity."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                }
            },
            "additionalProperties": false
        })
    }

    async fn run(&self, input: SearchEventsInput) -> AgentResult<String> {
        info!(query = %input.query, "searching events");
        let embedding = self.embedder.embed(&input.query).await?;

        let result = self
            .vector_store
            .query(&embedding, SEARCH_RESULTS)
            .await
            .map_err(|e| AgentError::ExecutionError(format!("Vector search failed: {:#}", e)))?;

        let hits = match collect_hits(result) {
            Some(hits) if !hits.is_empty() => hits,
            _ => return Ok(NO_EVENTS_FOUND.to_string()),
        };

        let lines: Vec<String> = hits.iter().map(SearchHit::render).collect();
        for line in &lines {
            debug!(event = %line, "found event");
        }
        Ok(lines.join("\n"))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::models::tool::ToolCall;
    use crate::tools::ToolRegistry;

    fn registry(embedder: FakeEmbedder, store: FakeVectorStore) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(SearchEventsTool::new(Arc::new(embedder), Arc::new(store)))
            .unwrap();
        registry
    }

    async fn search(registry: &ToolRegistry, arguments: Value) -> AgentResult<String> {
        registry
            .dispatch(Ok(ToolCall::new("searchEvents", arguments)))
            .await
    }

    #[tokio::test]
    async fn test_search_renders_hits() {
        let store = FakeVectorStore::returning(query_result(&[
            ("1", "Sprzątanie lasu", "Środowisko", 0.1234),
            ("3", "Sprzątanie plaży", "Środowisko", 0.25),
        ]));
        let registry = registry(FakeEmbedder::new(), store);

        let output = search(&registry, json!({"query": "environmental cleanup events"}))
            .await
            .unwrap();
        assert_eq!(
            output,
            "EventId: 1, Name: Sprzątanie lasu, Category: Środowisko, Score: 0.123\n\
             EventId: 3, Name: Sprzątanie plaży, Category: Środowisko, Score: 0.250"
        );
    }

    #[tokio::test]
    async fn test_search_sorts_by_distance_and_caps_results() {
        let store = FakeVectorStore::returning(query_result(&[
            ("7", "G", "Inne", 0.7),
            ("2", "B", "Sport", 0.2),
            ("5", "E", "Sport", 0.5),
            ("1", "A", "Sport", 0.1),
            ("6", "F", "Inne", 0.6),
            ("3", "C", "Kultura", 0.3),
        ]));
        let registry = registry(FakeEmbedder::new(), store);

        let output = search(&registry, json!({"query": "sport"})).await.unwrap();
        let scores: Vec<f32> = output
            .lines()
            .map(|l| l.rsplit("Score: ").next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(scores.len(), SEARCH_RESULTS);
        assert!(scores.windows(2).all(|w| w[0] <= w[1]));
        assert!(output.starts_with("EventId: 1,"));
    }

    #[tokio::test]
    async fn test_search_missing_metadata_fields() {
        let mut result = query_result(&[("4", "x", "y", 0.5)]);
        result.metadatas = Some(vec![Some(vec![None])]);
        result.distances = Some(vec![Some(vec![None])]);
        let registry = registry(FakeEmbedder::new(), FakeVectorStore::returning(result));

        let output = search(&registry, json!({"query": "cokolwiek"})).await.unwrap();
        assert_eq!(output, "EventId: 4, Name: Unknown, Category: Unknown, Score: N/A");
    }

    #[tokio::test]
    async fn test_search_no_results() {
        for result in [
            QueryResult::default(),
            QueryResult {
                ids: vec![vec![]],
                metadatas: Some(vec![Some(vec![])]),
                distances: Some(vec![Some(vec![])]),
            },
        ] {
            let registry = registry(FakeEmbedder::new(), FakeVectorStore::returning(result));
            let output = search(&registry, json!({"query": "nic"})).await;
            assert_eq!(output, Ok(NO_EVENTS_FOUND.to_string()));
        }
    }

    #[tokio::test]
    async fn test_search_malformed_results() {
        let well_formed = query_result(&[("1", "A", "Sport", 0.1)]);
        let mut missing_metadatas = well_formed.clone();
        missing_metadatas.metadatas = None;
        let mut missing_distances = well_formed.clone();
        missing_distances.distances = Some(vec![None]);

        for result in [missing_metadatas, missing_distances] {
            let registry = registry(FakeEmbedder::new(), FakeVectorStore::returning(result));
            let output = search(&registry, json!({"query": "sport"})).await;
            assert_eq!(output, Ok(NO_EVENTS_FOUND.to_string()));
        }
    }

    #[tokio::test]
    async fn test_search_embedding_unavailable() {
        let registry = registry(
            FakeEmbedder::unavailable(),
            FakeVectorStore::returning(query_result(&[("1", "A", "Sport", 0.1)])),
        );
        let output = search(&registry, json!({"query": "sport"})).await;
        assert!(matches!(output, Err(AgentError::EmbeddingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_search_store_failure() {
        let registry = registry(FakeEmbedder::new(), FakeVectorStore::failing("connection reset"));
        match search(&registry, json!({"query": "sport"})).await {
            Err(AgentError::ExecutionError(msg)) => assert!(msg.contains("connection reset")),
            other => panic!("Expected ExecutionError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_rejects_empty_query() {
        let embedder = Arc::new(FakeEmbedder::new());
        let mut registry = ToolRegistry::new();
        registry
            .register(SearchEventsTool::new(
                embedder.clone(),
                Arc::new(FakeVectorStore::returning(QueryResult::default())),
            ))
            .unwrap();

        for arguments in [json!({"query": "   "}), json!({}), json!({"query": 3})] {
            let output = search(&registry, arguments).await;
            assert!(matches!(output, Err(AgentError::InvalidParameters(_))));
        }
        assert!(embedder.calls.lock().unwrap().is_empty());
    }
}
