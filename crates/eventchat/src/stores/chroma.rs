use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;

use super::vector::{EventVector, QueryResult, VectorStore};

#[derive(Debug, Clone)]
pub struct ChromaConfig {
    pub host: String,
    pub api_key: Option<String>,
    pub tenant: String,
    pub database: String,
    pub collection: String,
}

/// Vector store client for a Chroma collection, over the v2 HTTP API
pub struct ChromaStore {
    client: Client,
    config: ChromaConfig,
    collection_id: String,
}

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(default)]
    ids: Vec<String>,
}

impl ChromaStore {
    /// Resolve the configured collection, creating it when missing
    pub async fn connect(config: ChromaConfig) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        let mut store = Self {
            client,
            config,
            collection_id: String::new(),
        };

        let response = store
            .post(
                "collections",
                json!({
                    "name": store.config.collection,
                    "get_or_create": true,
                }),
            )
            .await
            .context("Failed to get or create Chroma collection")?;
        let collection: CollectionResponse = serde_json::from_value(response)?;
        tracing::info!(
            collection = %store.config.collection,
            id = %collection.id,
            "connected to vector store"
        );
        store.collection_id = collection.id;
        Ok(store)
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    fn database_url(&self) -> String {
        format!(
            "{}/api/v2/tenants/{}/databases/{}",
            self.config.host.trim_end_matches('/'),
            self.config.tenant,
            self.config.database
        )
    }

    async fn post(&self, path: &str, payload: Value) -> Result<Value> {
        let url = format!("{}/{}", self.database_url(), path);
        let mut request = self.client.post(&url).json(&payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("x-chroma-token", api_key);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let body = response.text().await?;
                if body.trim().is_empty() {
                    Ok(Value::Null)
                } else {
                    Ok(serde_json::from_str(&body)?)
                }
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(anyhow!("Chroma request to {} failed: {} {}", path, status, body))
            }
        }
    }

    fn collection_path(&self, operation: &str) -> String {
        format!("collections/{}/{}", self.collection_id, operation)
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn query(&self, embedding: &[f32], k: usize) -> Result<QueryResult> {
        let response = self
            .post(
                &self.collection_path("query"),
                json!({
                    "query_embeddings": [embedding],
                    "n_results": k,
                    "include": ["metadatas", "documents", "distances"],
                }),
            )
            .await?;
        // Malformed bodies are reported as empty results and handled by the caller
        Ok(serde_json::from_value(response).unwrap_or_default())
    }

    async fn existing_ids(&self) -> Result<HashSet<String>> {
        let response = self
            .post(&self.collection_path("get"), json!({"include": ["metadatas"]}))
            .await?;
        let response: GetResponse = serde_json::from_value(response)?;
        Ok(response.ids.into_iter().collect())
    }

    async fn add(&self, records: Vec<EventVector>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        let embeddings: Vec<&[f32]> = records.iter().map(|r| r.embedding.as_slice()).collect();
        let metadatas: Vec<&serde_json::Map<String, Value>> =
            records.iter().map(|r| &r.metadata).collect();

        self.post(
            &self.collection_path("add"),
            json!({
                "ids": ids,
                "embeddings": embeddings,
                "metadatas": metadatas,
            }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BASE: &str = "/api/v2/tenants/tenant-1/databases/volunteering";

    async fn connected_store(server: &MockServer) -> ChromaStore {
        Mock::given(method("POST"))
            .and(path(format!("{}/collections", BASE)))
            .and(header("x-chroma-token", "chroma-key"))
            .and(body_partial_json(json!({"name": "events", "get_or_create": true})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "col-123", "name": "events"})),
            )
            .mount(server)
            .await;

        ChromaStore::connect(ChromaConfig {
            host: server.uri(),
            api_key: Some("chroma-key".to_string()),
            tenant: "tenant-1".to_string(),
            database: "volunteering".to_string(),
            collection: "events".to_string(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_connect_resolves_collection() {
        let server = MockServer::start().await;
        let store = connected_store(&server).await;
        assert_eq!(store.collection_id(), "col-123");
    }

    #[tokio::test]
    async fn test_query() {
        let server = MockServer::start().await;
        let store = connected_store(&server).await;

        Mock::given(method("POST"))
            .and(path(format!("{}/collections/col-123/query", BASE)))
            .and(body_partial_json(json!({"n_results": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ids": [["1", "3"]],
                "metadatas": [[
                    {"Name": "Sprzątanie lasu", "Category": "Środowisko"},
                    {"Name": "Sprzątanie plaży", "Category": "Środowisko"}
                ]],
                "documents": [[null, null]],
                "distances": [[0.125, 0.5]]
            })))
            .mount(&server)
            .await;

        let result = store.query(&[0.1, 0.2], 5).await.unwrap();
        assert_eq!(result.ids, vec![vec!["1".to_string(), "3".to_string()]]);
        let metadatas = result.metadatas.unwrap();
        let first = metadatas[0].as_ref().unwrap()[0].as_ref().unwrap();
        assert_eq!(first["Name"], "Sprzątanie lasu");
        assert_eq!(
            result.distances.unwrap()[0].as_ref().unwrap(),
            &vec![Some(0.125), Some(0.5)]
        );
    }

    #[tokio::test]
    async fn test_query_malformed_body_is_empty() {
        let server = MockServer::start().await;
        let store = connected_store(&server).await;

        Mock::given(method("POST"))
            .and(path(format!("{}/collections/col-123/query", BASE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ids": "oops"})))
            .mount(&server)
            .await;

        let result = store.query(&[0.1], 5).await.unwrap();
        assert!(result.ids.is_empty());
    }

    #[tokio::test]
    async fn test_query_server_error() {
        let server = MockServer::start().await;
        let store = connected_store(&server).await;

        Mock::given(method("POST"))
            .and(path(format!("{}/collections/col-123/query", BASE)))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(store.query(&[0.1], 5).await.is_err());
    }

    #[tokio::test]
    async fn test_existing_ids_and_add() {
        let server = MockServer::start().await;
        let store = connected_store(&server).await;

        Mock::given(method("POST"))
            .and(path(format!("{}/collections/col-123/get", BASE)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ids": ["1", "2"], "metadatas": []})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{}/collections/col-123/add", BASE)))
            .and(body_partial_json(json!({
                "ids": ["3"],
                "metadatas": [{"Name": "Bieg", "Category": "Sport"}]
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let ids = store.existing_ids().await.unwrap();
        assert_eq!(ids, HashSet::from(["1".to_string(), "2".to_string()]));

        let mut metadata = serde_json::Map::new();
        metadata.insert("Name".to_string(), json!("Bieg"));
        metadata.insert("Category".to_string(), json!("Sport"));
        store
            .add(vec![EventVector {
                id: "3".to_string(),
                embedding: vec![0.5, 0.25],
                metadata,
            }])
            .await
            .unwrap();
    }
}
