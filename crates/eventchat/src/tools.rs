//! Tools the model can call while answering questions about events.
//!
//! Every tool declares a typed input. Arguments coming from the model are decoded into that
//! type and validated before the tool body runs, so a handler only ever sees well-formed input.
pub mod lookup;
pub mod registry;
pub mod search;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{AgentError, AgentResult};

pub use lookup::{GetEventTool, GetEventsByCategoryTool};
pub use registry::ToolRegistry;
pub use search::SearchEventsTool;

/// Typed arguments of a tool
pub trait ToolInput: DeserializeOwned + Send {
    /// Checks that serde cannot express, run after decoding
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A single named capability offered to the model
#[async_trait]
pub trait ToolHandler: Send + Sync {
    type Input: ToolInput;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema of [`Self::Input`], as declared to the model
    fn input_schema(&self) -> Value;

    async fn run(&self, input: Self::Input) -> AgentResult<String>;
}

/// Decode and validate raw arguments for a tool
pub fn parse_arguments<T: ToolInput>(tool: &str, arguments: Value) -> AgentResult<T> {
    let input: T = serde_json::from_value(arguments).map_err(|e| {
        AgentError::InvalidParameters(format!("Arguments for {} failed validation: {}", tool, e))
    })?;
    input.validate().map_err(|reason| {
        AgentError::InvalidParameters(format!("Arguments for {} failed validation: {}", tool, reason))
    })?;
    Ok(input)
}
