mod config;
mod dto;
mod error;
mod handlers;
mod models;
mod repository;
mod server;
mod service;

use std::{error::Error, process::ExitCode, sync::Arc};

use tracing_subscriber::EnvFilter;

use error::StartupError;
use repository::Repository;
use service::NoteService;

#[tokio::main]
async fn main() -> ExitCode {
    // Log setup
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let mut message = e.to_string();
            let mut cause = e.source();
            while let Some(inner) = cause {
                message.push_str(": ");
                message.push_str(&inner.to_string());
                cause = inner.source();
            }

            tracing::error!("Note service stopped: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let cfg = config::load_config()?;
    tracing::info!("Successfully loaded note service config");

    // Storage setup; nothing is served unless both steps succeed
    let repo = Repository::connect(&cfg.database)
        .await
        .map_err(StartupError::Database)?;
    repo.init_schema().await.map_err(StartupError::Schema)?;

    // Service creation
    let service = Arc::new(NoteService::new(
        repo.clone(),
        cfg.notes.missing_row_policy,
    ));

    // Router config
    let router = server::build_router(service, &cfg.server);
    let listener = server::bind(&cfg.server.addr).await?;

    let result = server::serve(listener, router).await;
    repo.close().await;

    result
}
