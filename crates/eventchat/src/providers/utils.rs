use anyhow::{anyhow, Result};
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

use crate::errors::AgentError;
use crate::models::message::{AssistantMessage, Message, ToolRequest};
use crate::models::tool::{Tool, ToolCall};

/// Name sent for tool requests the model produced in an unusable form, so that the
/// error response that follows still has a matching tool call id.
const INVALID_TOOL_NAME: &str = "invalid_tool_call";

fn function_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("function name pattern is valid"))
}

fn invalid_char_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_-]").expect("sanitize pattern is valid"))
}

/// Convert the internal transcript to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| match message {
            Message::System { text } => json!({
                "role": "system",
                "content": text,
            }),
            Message::User { text } => json!({
                "role": "user",
                "content": text,
            }),
            Message::Assistant(assistant) => assistant_to_openai_spec(assistant),
            Message::Tool(response) => {
                let content = match &response.tool_result {
                    Ok(text) => text.clone(),
                    // A tool result error is shown as output so the model can interpret the error message
                    Err(e) => format!("The tool call returned the following error:\n{}", e),
                };
                json!({
                    "role": "tool",
                    "content": content,
                    "tool_call_id": response.id,
                })
            }
        })
        .collect()
}

fn assistant_to_openai_spec(message: &AssistantMessage) -> Value {
    let mut converted = json!({
        "role": "assistant",
        "content": message.text.as_deref().unwrap_or_default(),
    });

    if message.has_tool_requests() {
        let tool_calls: Vec<Value> = message
            .tool_requests
            .iter()
            .map(tool_request_to_openai_spec)
            .collect();
        converted["tool_calls"] = json!(tool_calls);
        if message.text.is_none() {
            converted["content"] = Value::Null;
        }
    }

    converted
}

fn tool_request_to_openai_spec(request: &ToolRequest) -> Value {
    let (name, arguments) = match &request.tool_call {
        Ok(tool_call) => (
            sanitize_function_name(&tool_call.name),
            tool_call.arguments.to_string(),
        ),
        Err(_) => (INVALID_TOOL_NAME.to_string(), "{}".to_string()),
    };
    json!({
        "id": request.id,
        "type": "function",
        "function": {
            "name": name,
            "arguments": arguments,
        }
    })
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// Convert OpenAI's API response to an assistant message
pub fn openai_response_to_message(response: &Value) -> Result<AssistantMessage> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("No message in response: {}", response))?;

    let mut message = AssistantMessage::default();

    if let Some(text) = original.get("content").and_then(|v| v.as_str()) {
        message = message.with_text(text);
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|v| v.as_array()) {
        for tool_call in tool_calls {
            let id = tool_call["id"].as_str().unwrap_or_default().to_string();
            let function_name = tool_call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default();

            if !is_valid_function_name(&function_name) {
                let error = AgentError::ToolNotFound(format!(
                    "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                    function_name
                ));
                message = message.with_tool_request(id, Err(error));
                continue;
            }

            let parsed = if arguments.trim().is_empty() {
                Ok(json!({}))
            } else {
                serde_json::from_str::<Value>(arguments)
            };
            match parsed {
                Ok(params) => {
                    message =
                        message.with_tool_request(id, Ok(ToolCall::new(&function_name, params)));
                }
                Err(e) => {
                    let error = AgentError::InvalidParameters(format!(
                        "Could not interpret tool use parameters for id {}: {}",
                        id, e
                    ));
                    message = message.with_tool_request(id, Err(error));
                }
            }
        }
    }

    Ok(message)
}

fn sanitize_function_name(name: &str) -> String {
    invalid_char_pattern().replace_all(name, "_").to_string()
}

fn is_valid_function_name(name: &str) -> bool {
    function_name_pattern().is_match(name)
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}
