//! Live channel adapter
//!
//! Keeps a WebSocket open to the backend for one pipeline run and republishes
//! the status changes addressed to that run as [`StatusUpdateEvent`]s.
//!
//! Dropped connections are retried a fixed number of times with a fixed
//! delay. Once the retries are exhausted the update stream simply ends; the
//! consumer treats that as "live updates unavailable", not as a failure.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::{SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use url::Url;
use vigil_core::domain::update::StatusUpdateEvent;
use vigil_core::dto::frame::LiveFrame;

use crate::credentials::CredentialProvider;
use crate::error::{ClientError, Result};

/// Reconnect attempts after a connection is lost
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Delay between reconnect attempts
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Updates buffered between the connection task and the consumer
pub const DEFAULT_BUFFER_SIZE: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Live channel configuration
#[derive(Debug, Clone)]
pub struct LiveChannelConfig {
    /// WebSocket base URL (e.g., "ws://localhost:8080")
    pub ws_base_url: String,
    /// Reconnect attempts before giving up (0 = never reconnect)
    pub max_reconnect_attempts: u32,
    /// Delay before each reconnect attempt
    pub reconnect_interval: Duration,
    /// Capacity of the update queue
    pub buffer_size: usize,
}

impl LiveChannelConfig {
    /// Creates a configuration with the default retry policy
    pub fn new(ws_base_url: impl Into<String>) -> Self {
        Self {
            ws_base_url: ws_base_url.into().trim_end_matches('/').to_string(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Derives the WebSocket base from the REST API base URL
    ///
    /// `http://host:8080/api` becomes `ws://host:8080`.
    pub fn from_api_url(api_url: &str) -> Result<Self> {
        Ok(Self::new(ws_base_from_api_url(api_url)?))
    }

    /// Overrides the retry policy
    pub fn with_reconnect(mut self, max_attempts: u32, interval: Duration) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self.reconnect_interval = interval;
        self
    }
}

/// Turns a REST base URL into the matching WebSocket base URL
pub fn ws_base_from_api_url(api_url: &str) -> Result<String> {
    let mut url = Url::parse(api_url)
        .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", api_url, e)))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ClientError::InvalidUrl(format!(
                "unsupported scheme {:?} in {}",
                other, api_url
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| ClientError::InvalidUrl(format!("cannot switch {} to {}", api_url, scheme)))?;

    let path = url.path().trim_end_matches('/');
    let path = path.strip_suffix("/api").unwrap_or(path).to_string();
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Endpoint of the live channel for one run, with the token as query parameter
pub fn live_endpoint(ws_base_url: &str, pipeline_run_id: &str, token: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(ws_base_url)
        .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", ws_base_url, e)))?;

    if url.scheme() != "ws" && url.scheme() != "wss" {
        return Err(ClientError::InvalidUrl(format!(
            "URL must use ws:// or wss:// scheme, got: {}",
            url.scheme()
        )));
    }

    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(format!("{} cannot be a base", ws_base_url)))?
        .pop_if_empty()
        .extend(["api", "v1", "gitlab", "ws", "pipeline-runs", pipeline_run_id]);

    if let Some(token) = token {
        url.query_pairs_mut().append_pair("token", token);
    }

    Ok(url)
}

/// Live status updates for one pipeline run
///
/// One channel serves exactly one run; watching several runs takes several
/// channels. Dropping the channel disconnects it.
pub struct PipelineRunChannel {
    pipeline_run_id: String,
    config: LiveChannelConfig,
    credentials: Arc<dyn CredentialProvider>,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl PipelineRunChannel {
    pub fn new(
        pipeline_run_id: impl Into<String>,
        config: LiveChannelConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            pipeline_run_id: pipeline_run_id.into(),
            config,
            credentials,
            shutdown: None,
            task: None,
        }
    }

    pub fn pipeline_run_id(&self) -> &str {
        &self.pipeline_run_id
    }

    /// Opens the connection and returns the stream of updates for this run
    ///
    /// Calling `connect` again replaces the previous connection. If the
    /// returned stream is dropped, the connection is closed.
    pub fn connect(&mut self) -> LiveUpdates {
        self.disconnect();

        let (events_tx, events_rx) = mpsc::channel(self.config.buffer_size.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = ConnectionWorker {
            pipeline_run_id: self.pipeline_run_id.clone(),
            config: self.config.clone(),
            credentials: Arc::clone(&self.credentials),
            events: events_tx,
            shutdown: shutdown_rx,
        };

        self.task = Some(tokio::spawn(worker.run()));
        self.shutdown = Some(shutdown_tx);

        LiveUpdates { events: events_rx }
    }

    /// Whether the connection task is still running
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Closes the connection and ends the update stream
    ///
    /// Cancels any pending reconnect. Safe to call repeatedly, or before
    /// `connect`.
    pub fn disconnect(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
            debug!("Disconnecting live channel for pipeline run {}", self.pipeline_run_id);
        }
        // The task winds down on its own once it sees the shutdown signal
        self.task = None;
    }
}

impl Drop for PipelineRunChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Stream of status updates produced by a [`PipelineRunChannel`]
///
/// Ends when the channel is disconnected or when reconnecting gave up.
pub struct LiveUpdates {
    events: mpsc::Receiver<StatusUpdateEvent>,
}

impl LiveUpdates {
    /// Waits for the next update; `None` once live updates are unavailable
    pub async fn recv(&mut self) -> Option<StatusUpdateEvent> {
        self.events.recv().await
    }
}

impl Stream for LiveUpdates {
    type Item = StatusUpdateEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

/// How a single connection ended
enum SessionEnd {
    /// Server closed or the connection broke; eligible for reconnect
    Lost,
    /// Disconnect was requested
    Shutdown,
    /// The update stream was dropped
    ConsumerGone,
}

struct ConnectionWorker {
    pipeline_run_id: String,
    config: LiveChannelConfig,
    credentials: Arc<dyn CredentialProvider>,
    events: mpsc::Sender<StatusUpdateEvent>,
    shutdown: watch::Receiver<bool>,
}

impl ConnectionWorker {
    async fn run(mut self) {
        let mut attempts: u32 = 0;

        loop {
            // token may have rotated since the last attempt
            let token = self.credentials.current_token();
            let url = match live_endpoint(
                &self.config.ws_base_url,
                &self.pipeline_run_id,
                token.as_deref(),
            ) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Live channel disabled for pipeline run {}: {}", self.pipeline_run_id, e);
                    return;
                }
            };

            let connected = tokio::select! {
                _ = wait_for_shutdown(&mut self.shutdown) => return,
                _ = self.events.closed() => return,
                result = connect_async(url.as_str()) => result,
            };

            match connected {
                Ok((ws, _response)) => {
                    info!("Live channel connected for pipeline run {}", self.pipeline_run_id);
                    attempts = 0;

                    match self.pump(ws).await {
                        SessionEnd::Lost => {
                            info!("Live channel closed for pipeline run {}", self.pipeline_run_id)
                        }
                        SessionEnd::Shutdown | SessionEnd::ConsumerGone => return,
                    }
                }
                Err(e) => {
                    warn!(
                        "Live channel connection failed for pipeline run {}: {}",
                        self.pipeline_run_id, e
                    );
                }
            }

            if attempts >= self.config.max_reconnect_attempts {
                warn!(
                    "Max reconnect attempts reached for pipeline run {}, live updates unavailable",
                    self.pipeline_run_id
                );
                return;
            }
            attempts += 1;

            tokio::select! {
                _ = wait_for_shutdown(&mut self.shutdown) => return,
                _ = self.events.closed() => return,
                _ = tokio::time::sleep(self.config.reconnect_interval) => {}
            }

            info!(
                "Reconnecting live channel for pipeline run {} (attempt {}/{})",
                self.pipeline_run_id, attempts, self.config.max_reconnect_attempts
            );
        }
    }

    /// Forwards matching frames until the connection ends
    async fn pump(&mut self, ws: WsStream) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();

        loop {
            let message = tokio::select! {
                _ = wait_for_shutdown(&mut self.shutdown) => {
                    let _ = sink.close().await;
                    return SessionEnd::Shutdown;
                }
                _ = self.events.closed() => {
                    let _ = sink.close().await;
                    return SessionEnd::ConsumerGone;
                }
                message = stream.next() => message,
            };

            match message {
                Some(Ok(Message::Text(text))) => {
                    let Some(event) = decode_frame(&self.pipeline_run_id, text.as_str()) else {
                        continue;
                    };

                    let delivered = tokio::select! {
                        _ = wait_for_shutdown(&mut self.shutdown) => {
                            let _ = sink.close().await;
                            return SessionEnd::Shutdown;
                        }
                        sent = self.events.send(event) => sent.is_ok(),
                    };
                    if !delivered {
                        let _ = sink.close().await;
                        return SessionEnd::ConsumerGone;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("Server closed live channel: {:?}", frame);
                    return SessionEnd::Lost;
                }
                Some(Ok(Message::Binary(_))) => {
                    debug!("Ignoring binary frame on live channel");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Live channel error for pipeline run {}: {}", self.pipeline_run_id, e);
                    return SessionEnd::Lost;
                }
                None => return SessionEnd::Lost,
            }
        }
    }
}

/// Resolves once a disconnect has been requested or the channel is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Parses one text frame, keeping only status changes for the given run
fn decode_frame(pipeline_run_id: &str, text: &str) -> Option<StatusUpdateEvent> {
    let frame: LiveFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Failed to parse live channel frame: {}", e);
            return None;
        }
    };

    if !frame.is_status_change_for(pipeline_run_id) {
        debug!(
            "Dropping {} frame for {:?} on channel for {}",
            frame.frame_type, frame.id, pipeline_run_id
        );
        return None;
    }

    match frame.decode_event() {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Dropping malformed status change for pipeline run {}: {}", pipeline_run_id, e);
            None
        }
    }
}
