pub mod agent;
pub mod embeddings;
pub mod errors;
pub mod handler;
pub mod indexer;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod stores;
pub mod tools;
