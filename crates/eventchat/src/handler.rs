use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::agent::{Agent, DEFAULT_MAX_ROUND_TRIPS};
use crate::embeddings::Embedder;
use crate::errors::ReplyError;
use crate::prompt_template::system_prompt;
use crate::providers::base::Provider;
use crate::providers::configs::OpenAiProviderConfig;
use crate::providers::openai::OpenAiProvider;
use crate::stores::chroma::{ChromaConfig, ChromaStore};
use crate::stores::events::{EventStore, SqliteEventStore};
use crate::stores::vector::VectorStore;
use crate::tools::ToolRegistry;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Clients shared by every request, built once at start-up
#[derive(Clone)]
pub struct AssistantContext {
    pub provider: Arc<dyn Provider>,
    pub embedder: Arc<dyn Embedder>,
    pub vector_store: Arc<dyn VectorStore>,
    pub event_store: Arc<dyn EventStore>,
}

impl AssistantContext {
    pub fn new(
        provider: Arc<dyn Provider>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        event_store: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            provider,
            embedder,
            vector_store,
            event_store,
        }
    }

    /// Connect to the model service, the vector store and the event database
    pub async fn init(
        provider_config: OpenAiProviderConfig,
        chroma_config: ChromaConfig,
        database_path: &Path,
    ) -> Result<Self> {
        let openai = Arc::new(OpenAiProvider::new(provider_config)?);
        let vector_store = ChromaStore::connect(chroma_config)
            .await
            .context("Failed to connect to the vector store")?;
        let event_store = SqliteEventStore::open(database_path).with_context(|| {
            format!("Failed to open event database {}", database_path.display())
        })?;

        Ok(Self::new(
            openai.clone(),
            openai,
            Arc::new(vector_store),
            Arc::new(event_store),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct HandlerOptions {
    pub max_round_trips: usize,
    pub request_timeout: Duration,
    /// Template replacing the built-in system prompt
    pub system_prompt_file: Option<PathBuf>,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            max_round_trips: DEFAULT_MAX_ROUND_TRIPS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            system_prompt_file: None,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum HandleError {
    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("Failed to process message")]
    Failed,
}

/// Answers one chat message per call
pub struct ChatHandler {
    agent: Agent,
    system_prompt: String,
    request_timeout: Duration,
}

impl ChatHandler {
    pub fn new(context: &AssistantContext, options: HandlerOptions) -> Result<Self> {
        let registry = ToolRegistry::for_events(
            Arc::clone(&context.embedder),
            Arc::clone(&context.vector_store),
            Arc::clone(&context.event_store),
        )?;
        let system_prompt = system_prompt(&registry.tools(), options.system_prompt_file.as_deref())
            .context("Failed to render the system prompt")?;
        let agent = Agent::new(Arc::clone(&context.provider), Arc::new(registry))
            .with_max_round_trips(options.max_round_trips);

        Ok(Self {
            agent,
            system_prompt,
            request_timeout: options.request_timeout,
        })
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Answer one user message. Text that is empty after trimming is rejected with
    /// `HandleError::EmptyMessage` before the model is called; any agent failure or
    /// timeout is logged and returned as `HandleError::Failed`.
    pub async fn handle(&self, text: &str) -> Result<String, HandleError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(HandleError::EmptyMessage);
        }

        info!(length = text.len(), "handling chat message");
        let result = match tokio::time::timeout(
            self.request_timeout,
            self.agent.reply(&self.system_prompt, text),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ReplyError::Timeout(self.request_timeout)),
        };

        result.map_err(|e| {
            error!(error = ?e, "failed to process message");
            HandleError::Failed
        })
    }
}
