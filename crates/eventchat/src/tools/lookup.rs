use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::debug;

use super::{ToolHandler, ToolInput};
use crate::errors::{AgentError, AgentResult};
use crate::models::event::Category;
use crate::stores::events::{EventStore, EventStoreError};

impl From<EventStoreError> for AgentError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::InvalidCategory { .. } => {
                AgentError::InvalidCategoryData(err.to_string())
            }
            EventStoreError::Backend(e) => AgentError::ExecutionError(format!("{:#}", e)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GetEventInput {
    pub event_id: i64,
}

impl ToolInput for GetEventInput {}

/// Exact lookup of one event by its id
pub struct GetEventTool {
    store: Arc<dyn EventStore>,
}

impl GetEventTool {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolHandler for GetEventTool {
    type Input = GetEventInput;

    fn name(&self) -> &'static str {
        "getEvent"
    }

    fn description(&self) -> &'static str {
        "Retrieve event details by EventId."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["eventId"],
            "properties": {
                "eventId": {
                    "type": "integer",
                    "description": "The ID of the event to retrieve."
                }
            },
            "additionalProperties": false
        })
    }

    async fn run(&self, input: GetEventInput) -> AgentResult<String> {
        let event_id = input.event_id;
        match self.store.get_event(event_id).await? {
            Some(event) => {
                let event_data = event.describe();
                debug!(event = %event_data, "found event");
                Ok(event_data)
            }
            None => Ok(format!("No event found with EventId {}", event_id)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetEventsByCategoryInput {
    pub category: Category,
}

impl ToolInput for GetEventsByCategoryInput {}

/// All events of one category, one per line
pub struct GetEventsByCategoryTool {
    store: Arc<dyn EventStore>,
}

impl GetEventsByCategoryTool {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolHandler for GetEventsByCategoryTool {
    type Input = GetEventsByCategoryInput;

    fn name(&self) -> &'static str {
        "getEventsByCategory"
    }

    fn description(&self) -> &'static str {
        "Retrieve events by Category."
    }

    fn input_schema(&self) -> Value {
        let categories: Vec<String> = Category::iter().map(|c| c.to_string()).collect();
        json!({
            "type": "object",
            "required": ["category"],
            "properties": {
                "category": {
                    "type": "string",
                    "enum": categories,
                    "description": "The category of events to retrieve."
                }
            },
            "additionalProperties": false
        })
    }

    async fn run(&self, input: GetEventsByCategoryInput) -> AgentResult<String> {
        let category = input.category;
        let events = self.store.events_by_category(category).await?;
        if events.is_empty() {
            return Ok(format!("No events found with Category {}", category));
        }
        debug!(%category, count = events.len(), "found events");
        Ok(events
            .iter()
            .map(|event| event.summary_line())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
