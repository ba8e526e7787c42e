//! These models represent the objects passed around by the agent
//!
//! There are a few related formats we need to interact with:
//! - the chat endpoint body, sent from the web interface to the assistant
//! - openai messages/tools, sent from the agent to the LLM
//! - event rows and vector store records, read by the tools
//!
//! We always immediately convert those data models into the internal structs using
//! to/from helpers, so the agent loop only ever sees the types defined here.
pub mod event;
pub mod message;
pub mod role;
pub mod tool;
