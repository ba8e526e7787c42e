use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::message::{AssistantMessage, Message};
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Base trait for chat model providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next assistant message for the transcript.
    ///
    /// The transcript already starts with the system message, so providers forward it as is.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(AssistantMessage, Usage)>;
}
