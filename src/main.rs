mod app;
mod commands;
mod config;
mod detection;
mod error;
mod feedback;
mod frame;
mod messages;
mod notify;
mod overlay;
mod persistence;
mod policy;
mod preferences;
mod screenshot;
mod services;

use app::App;
use config::Config;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting camwatch webcam viewer");

    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    App::new(config).run().await
}
