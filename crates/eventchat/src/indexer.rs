use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Map};
use tracing::{error, info};

use crate::embeddings::Embedder;
use crate::stores::events::EventStore;
use crate::stores::vector::{EventVector, VectorStore};

/// Outcome of one indexing pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub total: usize,
    pub indexed: usize,
    /// Events already present in the vector store
    pub skipped: usize,
    /// Rows that could not be decoded or embedded
    pub failed: usize,
}

/// Embed every event not yet in the vector store and add it there
pub async fn index_events(
    event_store: &dyn EventStore,
    embedder: &dyn Embedder,
    vector_store: &dyn VectorStore,
) -> Result<IndexReport> {
    let existing = vector_store
        .existing_ids()
        .await
        .context("Failed to list indexed events")?;
    info!(count = existing.len(), "events already indexed");

    let rows = event_store
        .all_events()
        .await
        .context("Failed to read events")?;
    info!(count = rows.len(), "fetched events from the database");

    let mut report = IndexReport {
        total: rows.len(),
        ..Default::default()
    };
    for row in rows {
        let event = match row {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "skipping event with invalid data");
                report.failed += 1;
                continue;
            }
        };
        let id = event.event_id.to_string();
        if existing.contains(&id) {
            report.skipped += 1;
            continue;
        }

        let embedding = match embedder.embed(&event.embedding_text()).await {
            Ok(embedding) => embedding,
            Err(e) => {
                error!(event_id = event.event_id, error = %e, "embedding not found for event");
                report.failed += 1;
                continue;
            }
        };

        let mut metadata = Map::new();
        metadata.insert("Name".to_string(), json!(event.name));
        metadata.insert("Category".to_string(), json!(event.category));
        vector_store
            .add(vec![EventVector {
                id,
                embedding,
                metadata,
            }])
            .await
            .with_context(|| format!("Failed to add event {} to the vector store", event.event_id))?;
        report.indexed += 1;
    }

    info!(?report, "indexing complete");
    Ok(report)
}
