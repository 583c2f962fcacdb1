use clap::Parser;
use tracing_subscriber::EnvFilter;

use phone_review::cli::{self, Cli};
use phone_review::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so local runs pick up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("phone_review=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    tracing::info!("Starting phone-review in {:?} mode", config.environment);

    cli::run(cli, config).await
}
