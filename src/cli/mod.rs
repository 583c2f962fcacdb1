use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::{AppConfig, DatabaseProvider};
use crate::database::DatabaseManager;
use crate::routes;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "phone-review")]
#[command(about = "Phone review API server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overrides PORT/API_PORT")]
        port: Option<u16>,
    },

    #[command(about = "Apply database migrations and exit")]
    Migrate,
}

pub async fn run(cli: Cli, mut config: AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.api.port = port;
            }
            serve(config).await
        }
        Commands::Migrate => migrate(&config).await,
    }
}

/// Binds the configured address and serves until Ctrl-C
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let bind_addr = format!("{}:{}", config.api.bind_addr, config.api.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    let store = DatabaseManager::open_store(&config.database).await?;
    info!("Phone review API listening on http://{}", listener.local_addr()?);

    let app = routes::app(AppState::new(config, store));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    if config.database.provider == DatabaseProvider::Memory {
        anyhow::bail!("nothing to migrate: DB_PROVIDER is 'memory'");
    }
    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::migrate(&pool).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::parse_from(["phone-review"]);
        assert!(cli.command.is_none());

        let cli = Cli::parse_from(["phone-review", "serve", "--port", "9000"]);
        assert!(matches!(cli.command, Some(Commands::Serve { port: Some(9000) })));

        let cli = Cli::parse_from(["phone-review", "migrate"]);
        assert!(matches!(cli.command, Some(Commands::Migrate)));
    }
}
