//! CLI configuration
//!
//! Connection settings for the dashboard backend, resolved from flags and
//! environment variables.

use std::path::PathBuf;
use std::time::Duration;

use vigil_client::live::{self, LiveChannelConfig};
use vigil_client::{DashboardClient, NoCredentials, StaticToken, TokenFile};

/// Upper bound for the reconnect attempts setting
pub const MAX_RECONNECT_ATTEMPTS: u32 = 100;

/// Where the bearer token comes from
#[derive(Debug, Clone, PartialEq)]
pub enum TokenSource {
    None,
    Static(String),
    /// Re-read on every request and reconnect attempt
    File(PathBuf),
}

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// REST API base URL (e.g., "http://localhost:8080/api")
    pub api_url: String,

    /// WebSocket base URL; derived from `api_url` when not set
    pub ws_url: Option<String>,

    pub token: TokenSource,

    /// Reconnect attempts after the live channel drops
    pub reconnect_attempts: u32,

    /// Delay between reconnect attempts
    pub reconnect_interval: Duration,
}

impl Config {
    /// Creates a configuration with the default retry policy and no token
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ws_url: None,
            token: TokenSource::None,
            reconnect_attempts: live::DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_interval: live::DEFAULT_RECONNECT_INTERVAL,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_url.is_empty() {
            anyhow::bail!("api_url cannot be empty");
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("api_url must start with http:// or https://");
        }

        if let Some(ws_url) = &self.ws_url {
            if !ws_url.starts_with("ws://") && !ws_url.starts_with("wss://") {
                anyhow::bail!("ws_url must start with ws:// or wss://");
            }
        }

        if self.reconnect_interval.is_zero() {
            anyhow::bail!("reconnect_interval must be greater than 0");
        }

        if self.reconnect_attempts > MAX_RECONNECT_ATTEMPTS {
            anyhow::bail!("reconnect_attempts cannot exceed {}", MAX_RECONNECT_ATTEMPTS);
        }

        if matches!(&self.token, TokenSource::Static(token) if token.trim().is_empty()) {
            anyhow::bail!("token cannot be empty");
        }

        Ok(())
    }

    /// REST client carrying the configured credentials
    pub fn dashboard_client(&self) -> DashboardClient {
        let client = DashboardClient::new(&self.api_url);
        match &self.token {
            TokenSource::None => client.with_credentials(NoCredentials),
            TokenSource::Static(token) => client.with_credentials(StaticToken::new(token)),
            TokenSource::File(path) => client.with_credentials(TokenFile::new(path.clone())),
        }
    }

    /// Live channel settings
    pub fn live_channel(&self) -> anyhow::Result<LiveChannelConfig> {
        let config = match &self.ws_url {
            Some(ws_url) => LiveChannelConfig::new(ws_url),
            None => LiveChannelConfig::from_api_url(&self.api_url)?,
        };
        Ok(config.with_reconnect(self.reconnect_attempts, self.reconnect_interval))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("http://localhost:8080/api")
    }
}
