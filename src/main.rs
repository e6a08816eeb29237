mod cli;

use dotenvy::dotenv;
use leadyard::{config::settings::Settings, errors::Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also come from the real environment
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Gather settings once and hand them to the command
    let settings = Settings::from_env();

    cli::run(settings)
        .await
        .inspect_err(|e| error!("Command failed: {}", e))
}
