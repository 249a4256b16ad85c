//! Runtime settings for delivery, the relay and storage
//!
//! Loaded in layers, later layers winning:
//! 1. Built-in defaults
//! 2. JSON file (~/.config/leadline/leadline.json)
//! 3. Environment variables

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::webhook::{MessageSink, RelayClient, Transport, WebhookClient};

/// Settings filename in the Leadline config directory
const SETTINGS_FILE: &str = "leadline.json";

/// Database filename used when no path is configured
const DATABASE_FILE: &str = "leadline.db";

/// Webhook endpoint used when nothing is configured (local n8n)
pub const DEFAULT_WEBHOOK_URL: &str = "http://localhost:5678/webhook/enviarm_mensaje";

/// Bind address used by the relay when nothing is configured
pub const DEFAULT_RELAY_ADDR: &str = "127.0.0.1:8787";

const ENV_WEBHOOK_URL: &str = "LEADLINE_WEBHOOK_URL";
const ENV_TRANSPORT: &str = "LEADLINE_WEBHOOK_TRANSPORT";
const ENV_TIMEOUT: &str = "LEADLINE_WEBHOOK_TIMEOUT_SECS";
const ENV_RELAY_URL: &str = "LEADLINE_RELAY_URL";
const ENV_RELAY_ADDR: &str = "LEADLINE_RELAY_ADDR";
const ENV_DATABASE: &str = "LEADLINE_DB";

/// Leadline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Chat-network webhook endpoint
    pub webhook_url: String,
    /// Preferred webhook transport
    pub transport: Transport,
    /// Whole-request timeout for webhook calls; 0 disables it
    pub timeout_secs: u64,
    /// Deliver through a relay service at this URL instead of calling the
    /// webhook directly
    pub relay_url: Option<String>,
    /// Address the relay service binds to
    pub relay_addr: String,
    /// SQLite database path; defaults to the config directory
    pub database_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            transport: Transport::Post,
            timeout_secs: 30,
            relay_url: None,
            relay_addr: DEFAULT_RELAY_ADDR.to_string(),
            database_path: None,
        }
    }
}

impl Settings {
    /// Load settings: defaults, then the config file if present, then env
    pub fn load() -> Result<Self> {
        let settings = if config::config_exists(SETTINGS_FILE) {
            config::load_json(SETTINGS_FILE)?
        } else {
            Self::default()
        };
        settings.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse settings JSON")
    }

    /// Apply overrides from an environment lookup
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_WEBHOOK_URL) {
            self.webhook_url = url;
        }
        if let Some(transport) = lookup(ENV_TRANSPORT) {
            self.transport = transport
                .parse()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Invalid {ENV_TRANSPORT}"))?;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            self.timeout_secs = timeout
                .trim()
                .parse()
                .with_context(|| format!("Invalid {ENV_TIMEOUT}: {timeout}"))?;
        }
        if let Some(url) = lookup(ENV_RELAY_URL) {
            self.relay_url = Some(url).filter(|u| !u.is_empty());
        }
        if let Some(addr) = lookup(ENV_RELAY_ADDR) {
            self.relay_addr = addr;
        }
        if let Some(path) = lookup(ENV_DATABASE) {
            self.database_path = Some(PathBuf::from(path));
        }
        Ok(self)
    }

    /// Webhook timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Resolved database path
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(config::init()?.join(DATABASE_FILE)),
        }
    }

    /// Client for calling the webhook directly
    pub fn webhook_client(&self) -> WebhookClient {
        WebhookClient::new(&self.webhook_url, self.transport, self.timeout())
    }

    /// The sink outbound messages should go through: the relay when one is
    /// configured, otherwise the webhook directly
    pub fn message_sink(&self) -> Arc<dyn MessageSink> {
        match &self.relay_url {
            Some(url) => {
                debug!("Delivering through relay at {}", url);
                Arc::new(RelayClient::new(url, self.timeout()))
            }
            None => {
                debug!("Delivering directly to {}", self.webhook_url);
                Arc::new(self.webhook_client())
            }
        }
    }

    /// Default settings file path (~/.config/leadline/leadline.json)
    pub fn default_settings_path() -> Option<PathBuf> {
        config::config_path(SETTINGS_FILE)
    }

    /// Write these settings to the default settings file
    pub fn save(&self) -> Result<PathBuf> {
        config::save_json(SETTINGS_FILE, self)
    }
}
