use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::{parse_arguments, GetEventTool, GetEventsByCategoryTool, SearchEventsTool, ToolHandler};
use crate::embeddings::Embedder;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};
use crate::stores::events::EventStore;
use crate::stores::vector::VectorStore;

/// Object-safe view of a registered handler
#[async_trait]
trait RegisteredTool: Send + Sync {
    fn tool(&self) -> &Tool;

    async fn call(&self, arguments: Value) -> AgentResult<String>;
}

struct Registered<H> {
    tool: Tool,
    handler: H,
}

#[async_trait]
impl<H: ToolHandler> RegisteredTool for Registered<H> {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    async fn call(&self, arguments: Value) -> AgentResult<String> {
        let input = parse_arguments::<H::Input>(&self.tool.name, arguments)?;
        self.handler.run(input).await
    }
}

/// The fixed set of tools exposed to the model, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn RegisteredTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry used by the assistant: `getEvent`, `getEventsByCategory` and `searchEvents`
    pub fn for_events(
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        event_store: Arc<dyn EventStore>,
    ) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(GetEventTool::new(Arc::clone(&event_store)))?;
        registry.register(GetEventsByCategoryTool::new(event_store))?;
        registry.register(SearchEventsTool::new(embedder, vector_store))?;
        Ok(registry)
    }

    /// Add a tool, rejecting duplicate names
    pub fn register<H: ToolHandler + 'static>(&mut self, handler: H) -> Result<()> {
        let name = handler.name();
        if self.get(name).is_some() {
            bail!("Duplicate tool name: {}", name);
        }
        let tool = Tool::new(name, handler.description(), handler.input_schema());
        self.tools.push(Box::new(Registered { tool, handler }));
        Ok(())
    }

    /// Declarations sent to the model
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.tool().clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn get(&self, name: &str) -> Option<&dyn RegisteredTool> {
        self.tools
            .iter()
            .find(|t| t.tool().name == name)
            .map(|t| t.as_ref())
    }

    /// Resolve, validate and run a single tool call.
    ///
    /// Every failure is returned as an [`AgentError`] for the transcript; nothing here ends the run.
    pub async fn dispatch(&self, tool_call: AgentResult<ToolCall>) -> AgentResult<String> {
        let call = tool_call?;
        let tool = self
            .get(&call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        info!(tool = %call.name, arguments = %call.arguments, "invoking tool");
        let result = tool.call(call.arguments).await;
        if let Err(e) = &result {
            warn!(tool = %call.name, error = %e, "tool call failed");
        }
        result
    }
}
