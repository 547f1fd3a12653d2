mod commands;
mod config;
mod console;

use api_client::ApiClient;
use catalog::Catalog;
use config::{api_url_from_env, config_path_from_env, load_or_create_config};
use console::Console;
use tokio::io::BufReader;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = config_path_from_env();
    let (mut config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }
    if let Some(url) = api_url_from_env() {
        info!("Using API url {} from environment", url);
        config.api_url = url;
    }

    let client = ApiClient::new(&config.api_config())?;
    let catalog = Catalog::with_debounce(client, config.search_debounce());
    if let Err(err) = catalog.load().await {
        warn!("Initial load from {} failed: {}", config.api_url, err);
    }

    let mut console = Console::new(
        &catalog,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    );
    console.run().await?;
    info!("Bye");
    Ok(())
}
