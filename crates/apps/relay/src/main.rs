//! Leadline relay service entry point

use crm::Settings;
use log::{error, info};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load settings: {:#}", e);
            std::process::exit(1);
        }
    };
    if let Some(path) = Settings::default_settings_path() {
        info!("Settings file: {}", path.display());
    }

    if let Err(e) = relay::run(settings).await {
        error!("Relay stopped: {:#}", e);
        std::process::exit(1);
    }
}
