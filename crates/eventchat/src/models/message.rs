use super::role::Role;
use super::tool::ToolCall;
use crate::errors::AgentResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub tool_call: AgentResult<ToolCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub id: String,
    pub tool_result: AgentResult<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Output of one model invocation: optional text plus any tool requests
pub struct AssistantMessage {
    pub text: Option<String>,
    pub tool_requests: Vec<ToolRequest>,
}

impl AssistantMessage {
    /// Add text to the message, appending to any text already present
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        let text = text.into();
        self.text = Some(match self.text.take() {
            Some(existing) => existing + &text,
            None => text,
        });
        self
    }

    /// Add a tool request to the message
    pub fn with_tool_request<S: Into<String>>(
        mut self,
        id: S,
        tool_call: AgentResult<ToolCall>,
    ) -> Self {
        self.tool_requests.push(ToolRequest {
            id: id.into(),
            tool_call,
        });
        self
    }

    pub fn has_tool_requests(&self) -> bool {
        !self.tool_requests.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
/// A single entry of the conversation transcript
pub enum Message {
    System { text: String },
    User { text: String },
    Assistant(AssistantMessage),
    Tool(ToolResponse),
}

impl Message {
    pub fn system<S: Into<String>>(text: S) -> Self {
        Message::System { text: text.into() }
    }

    pub fn user<S: Into<String>>(text: S) -> Self {
        Message::User { text: text.into() }
    }

    /// Create an empty assistant message, to be filled with the builder methods
    pub fn assistant() -> AssistantMessage {
        AssistantMessage::default()
    }

    pub fn tool_response<S: Into<String>>(id: S, tool_result: AgentResult<String>) -> Self {
        Message::Tool(ToolResponse {
            id: id.into(),
            tool_result,
        })
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant(_) => Role::Assistant,
            Message::Tool(_) => Role::Tool,
        }
    }

    pub fn as_assistant(&self) -> Option<&AssistantMessage> {
        match self {
            Message::Assistant(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_tool_response(&self) -> Option<&ToolResponse> {
        match self {
            Message::Tool(response) => Some(response),
            _ => None,
        }
    }
}

impl From<AssistantMessage> for Message {
    fn from(message: AssistantMessage) -> Self {
        Message::Assistant(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AgentError;
    use serde_json::json;

    #[test]
    fn test_assistant_builder() {
        let message = Message::assistant()
            .with_text("Looking that up")
            .with_tool_request("1", Ok(ToolCall::new("getEvent", json!({"eventId": 1}))))
            .with_tool_request("2", Err(AgentError::ToolNotFound("bogus".into())));

        assert_eq!(message.text.as_deref(), Some("Looking that up"));
        assert_eq!(message.tool_requests.len(), 2);
        assert!(message.has_tool_requests());
        assert_eq!(message.tool_requests[1].id, "2");
    }

    #[test]
    fn test_roles() {
        assert_eq!(Message::system("s").role(), Role::System);
        assert_eq!(Message::user("u").role(), Role::User);
        assert_eq!(Message::from(Message::assistant()).role(), Role::Assistant);
        assert_eq!(Message::tool_response("1", Ok("x".into())).role(), Role::Tool);
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(Message::user("Cześć")).unwrap();
        assert_eq!(value, json!({"role": "user", "text": "Cześć"}));
    }
}
