use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::ReplyError;
use crate::models::message::{AssistantMessage, Message};
use crate::models::tool::Tool;
use crate::providers::base::Provider;
use crate::tools::ToolRegistry;

pub const DEFAULT_MAX_ROUND_TRIPS: usize = 8;

/// Where a conversation run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// The model is asked for the next assistant message
    AgentTurn,
    /// The tool requests of the latest assistant message are executed
    ToolTurn,
    Done,
}

/// The transcript and state of a single request
#[derive(Debug, Clone)]
pub struct ConversationRun {
    messages: Vec<Message>,
    state: TurnState,
    round_trips: usize,
}

impl ConversationRun {
    pub fn new<S: Into<String>, U: Into<String>>(system_prompt: S, user_text: U) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(user_text)],
            state: TurnState::AgentTurn,
            round_trips: 0,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn round_trips(&self) -> usize {
        self.round_trips
    }

    pub fn is_done(&self) -> bool {
        self.state == TurnState::Done
    }

    /// Text of the final assistant message, once the run is done
    pub fn final_answer(&self) -> Option<String> {
        if !self.is_done() {
            return None;
        }
        Some(
            self.latest_assistant()
                .and_then(|m| m.text.clone())
                .unwrap_or_default(),
        )
    }

    fn latest_assistant(&self) -> Option<&AssistantMessage> {
        self.messages.iter().rev().find_map(Message::as_assistant)
    }
}

/// Agent drives a chat model through tool calls until it produces an answer
pub struct Agent {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    max_round_trips: usize,
}

impl Agent {
    pub fn new(provider: Arc<dyn Provider>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            registry,
            max_round_trips: DEFAULT_MAX_ROUND_TRIPS,
        }
    }

    pub fn with_max_round_trips(mut self, max_round_trips: usize) -> Self {
        self.max_round_trips = max_round_trips;
        self
    }

    /// Tool declarations offered to the model
    pub fn tools(&self) -> Vec<Tool> {
        self.registry.tools()
    }

    /// Advance the run by one transition
    pub async fn step(&self, run: &mut ConversationRun, tools: &[Tool]) -> Result<(), ReplyError> {
        match run.state {
            TurnState::AgentTurn => {
                let (response, usage) = self
                    .provider
                    .complete(&run.messages, tools)
                    .await
                    .map_err(ReplyError::UpstreamModel)?;
                debug!(?usage, "model responded");

                let wants_tools = response.has_tool_requests();
                run.messages.push(response.into());
                if !wants_tools {
                    run.state = TurnState::Done;
                    return Ok(());
                }
                if run.round_trips >= self.max_round_trips {
                    warn!(limit = self.max_round_trips, "round trip limit reached");
                    return Err(ReplyError::RoundTripLimitExceeded(self.max_round_trips));
                }
                run.round_trips += 1;
                run.state = TurnState::ToolTurn;
            }
            TurnState::ToolTurn => {
                let requests = run
                    .latest_assistant()
                    .map(|m| m.tool_requests.clone())
                    .unwrap_or_default();
                info!(
                    round_trip = run.round_trips,
                    count = requests.len(),
                    "dispatching tool calls"
                );

                // Sibling calls run concurrently, responses keep request order
                let outputs = futures::future::join_all(
                    requests
                        .iter()
                        .map(|request| self.registry.dispatch(request.tool_call.clone())),
                )
                .await;
                for (request, output) in requests.into_iter().zip(outputs) {
                    run.messages.push(Message::tool_response(request.id, output));
                }
                run.state = TurnState::AgentTurn;
            }
            TurnState::Done => {}
        }
        Ok(())
    }

    /// Drive the run until it is done
    pub async fn run(&self, mut run: ConversationRun) -> Result<ConversationRun, ReplyError> {
        let tools = self.tools();
        while !run.is_done() {
            self.step(&mut run, &tools).await?;
        }
        Ok(run)
    }

    /// Answer a single user message
    pub async fn reply(&self, system_prompt: &str, user_text: &str) -> Result<String, ReplyError> {
        let run = self
            .run(ConversationRun::new(system_prompt, user_text))
            .await?;
        Ok(run.final_answer().unwrap_or_default())
    }
}
