use anyhow::Result;
use clap::Parser;
use gutenberg_api::config::Config;
use gutenberg_api::server::Server;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "gutenberg-api", version, about = "Fetch and analyze books from Project Gutenberg")]
struct Cli {
    /// Address to listen on, overrides BIND_ADDR
    #[arg(long)]
    bind_addr: Option<SocketAddr>,

    /// Log level, overrides LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let mut config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    if let Some(bind_addr) = cli.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("gutenberg_api={},tower_http=debug", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    gutenberg_api::response::mark_started();

    tracing::info!("Starting gutenberg-api service");
    tracing::info!(
        "Configuration: bind_addr={}, base_url={}, model={}",
        config.bind_addr,
        config.base_url,
        config.groq_model
    );

    let server = Server::new(config)
        .map_err(|e| anyhow::anyhow!("Failed to create server: {}", e))?;

    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
