//! Vigil client
//!
//! Talks to the dashboard backend on behalf of a pipeline-run view:
//!
//! - REST: fetch the pipeline run snapshot ([`DashboardClient`])
//! - Live channel: receive status updates for one run ([`live::PipelineRunChannel`])
//! - Watch: one open view gluing both to the merge engine ([`watch::PipelineRunWatch`])
//!
//! # Example
//!
//! ```no_run
//! use vigil_client::{DashboardClient, StaticToken};
//! use vigil_client::live::{LiveChannelConfig, PipelineRunChannel};
//! use vigil_client::watch::PipelineRunWatch;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = DashboardClient::new("http://localhost:8080/api")
//!         .with_credentials(StaticToken::new("secret"));
//!
//!     let config = LiveChannelConfig::from_api_url(client.base_url())?;
//!     let channel = PipelineRunChannel::new("run-1", config, client.credentials());
//!     let mut watch = PipelineRunWatch::open(&client, channel).await;
//!
//!     while let Some(entries) = watch.next_update().await {
//!         println!("{} entries", entries.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod credentials;
pub mod error;
pub mod live;
mod runs;
pub mod watch;

// Re-export commonly used types
pub use credentials::{CredentialProvider, EnvToken, NoCredentials, StaticToken, TokenFile};
pub use error::{ClientError, Result};
pub use runs::SnapshotProvider;

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use vigil_core::dto::envelope::ApiEnvelope;

/// HTTP client for the dashboard REST API
#[derive(Clone)]
pub struct DashboardClient {
    /// Base URL of the REST API (e.g., "http://localhost:8080/api")
    base_url: String,
    /// HTTP client instance
    client: Client,
    /// Bearer token source, consulted on every request
    credentials: Arc<dyn CredentialProvider>,
}

impl DashboardClient {
    /// Create a new client without credentials
    ///
    /// # Example
    /// ```
    /// use vigil_client::DashboardClient;
    ///
    /// let client = DashboardClient::new("http://localhost:8080/api");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use vigil_client::DashboardClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(10))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = DashboardClient::with_client("http://localhost:8080/api", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credentials: Arc::new(NoCredentials),
        }
    }

    /// Use the given provider for bearer tokens
    pub fn with_credentials(mut self, credentials: impl CredentialProvider + 'static) -> Self {
        self.credentials = Arc::new(credentials);
        self
    }

    /// Get the base URL of the REST API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Shared handle to the credential provider, for the live channel
    pub fn credentials(&self) -> Arc<dyn CredentialProvider> {
        Arc::clone(&self.credentials)
    }

    /// Attach the current bearer token, if one is available
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.current_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and unwrap the `{ message, data }` envelope
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        resource: &str,
    ) -> Result<T> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(resource.to_string()));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))?;

        Ok(envelope.data)
    }
}

impl std::fmt::Debug for DashboardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
