mod configuration;
mod error;
mod routes;
mod state;

use anyhow::Result;
use clap::{Parser, Subcommand};
use eventchat::handler::{AssistantContext, ChatHandler};
use eventchat::indexer::index_events;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::configuration::Settings;
use crate::state::AppState;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq)]
enum Command {
    /// Serve the chat API (default)
    Serve,
    /// Add events missing from the vector store
    Index,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::new()?;
    let context = AssistantContext::init(
        settings.provider.into_config(),
        settings.chroma.into_config(),
        &settings.database.path,
    )
    .await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let handler = ChatHandler::new(&context, settings.agent.handler_options())?;

            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            let app = routes::configure(AppState::new(handler)).layer(cors);

            let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()?).await?;
            info!("listening on {}", listener.local_addr()?);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Command::Index => {
            let report = index_events(
                context.event_store.as_ref(),
                context.embedder.as_ref(),
                context.vector_store.as_ref(),
            )
            .await?;
            info!(
                total = report.total,
                indexed = report.indexed,
                skipped = report.skipped,
                failed = report.failed,
                "indexing finished"
            );
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
