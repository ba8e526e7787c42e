use async_trait::async_trait;

use crate::errors::AgentResult;

/// Turns free text into a fixed-length vector.
///
/// Implementations fail with [`AgentError::EmbeddingUnavailable`](crate::errors::AgentError)
/// when the service errors or returns no vector, and never retry.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> AgentResult<Vec<f32>>;
}
