use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tracing::info;
use tracing_subscriber::EnvFilter;

use campusmeet::config::AppConfig;
use campusmeet::db::Database;
use campusmeet::notify::{mailer_from_config, DiscordClient, Notifier};
use campusmeet::server::create_router;
use campusmeet::types::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    info!("Starting CampusMeet ({})", config.app_env);

    let db = Database::open(&config.database_path).context("could not open database")?;
    let mailer = mailer_from_config(config.smtp.as_ref())?;
    if config.smtp.is_none() {
        info!("SMTP not configured, emails will only be logged");
    }
    let notifier = Notifier::new(DiscordClient::new()?, mailer);

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::new(config, db, notifier));
    let app = create_router(state);

    let listener = TcpListener::bind(bind_addr).await?;
    info!("Server running on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    match ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await
        }
    }
}
