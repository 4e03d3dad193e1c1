use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pahina::config::{Cli, Config};
use pahina::state::AppState;
use pahina::{db, mail, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Ensure uploads directory exists
    std::fs::create_dir_all(config.uploads_path())?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    let mailer = mail::from_config(&config.mail)?;

    // Build app state
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let base_url = config.base_url();
    let state = AppState::new(config, pool, mailer);
    let app = routes::router(state);

    // Start server
    tracing::info!("Listening on http://{} (links use {})", addr, base_url);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
