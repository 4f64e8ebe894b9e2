use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// `AppConfig` holds all configuration parameters required by the application.
///
/// The configuration is loaded from environment variables (optionally via a `.env` file)
/// or uses default values if the variable is not set. Fields cover the commerce
/// platform connection and the HTTP server.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    // --- Commerce platform ---
    /// Store domain (e.g. "my-shop.myshopify.com"). A value with a scheme is used as-is.
    pub commerce_store_url: String,
    /// Admin API access token. Never logged.
    pub commerce_api_token: String,
    /// Admin API version segment of the URL.
    pub commerce_api_version: String,
    /// Per-request timeout for commerce API calls (e.g. "30s").
    #[serde(deserialize_with = "deserialize_duration")]
    pub commerce_request_timeout: Duration,

    // --- HTTP server ---
    /// The port on which the HTTP server will listen.
    pub http_port: u16,
}

/// Accepts human-readable durations like "5s", "1m".
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let val = String::deserialize(deserializer)?;
    humantime::parse_duration(&val)
        .map_err(|e| D::Error::custom(format!("Invalid duration '{val}': {e}")))
}

impl AppConfig {
    /// Loads configuration from environment variables (and optionally from `.env` file).
    ///
    /// Fields not set via env will be filled with default values.
    ///
    /// # Errors
    /// Returns an error if environment variables are invalid or missing required values.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            // Commerce platform
            .set_default("commerce_store_url", "localhost")?
            .set_default("commerce_api_token", "")?
            .set_default("commerce_api_version", "2024-10")?
            .set_default("commerce_request_timeout", "30s")?
            // HTTP
            .set_default("http_port", 8081)?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        settings
            .try_deserialize()
            .context("Failed to load configuration")
    }

    /// Base URL of the commerce Admin API, ending with a slash.
    pub fn commerce_base_url(&self) -> String {
        let store = self.commerce_store_url.trim_end_matches('/');
        let root = if store.starts_with("http://") || store.starts_with("https://") {
            store.to_string()
        } else {
            format!("https://{store}")
        };
        format!("{root}/admin/api/{}/", self.commerce_api_version)
    }
}
