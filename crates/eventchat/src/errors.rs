use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while resolving or running a single tool call.
///
/// These are stored in the transcript and shown to the model as tool output,
/// so the conversation can continue after any of them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Invalid category in stored data: {0}")]
    InvalidCategoryData(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Errors that end a conversation run.
#[derive(Error, Debug)]
pub enum ReplyError {
    #[error("Language model request failed: {0}")]
    UpstreamModel(#[source] anyhow::Error),

    #[error("Exceeded the maximum of {0} tool round trips")]
    RoundTripLimitExceeded(usize),

    #[error("Request did not complete within {0:?}")]
    Timeout(Duration),
}
