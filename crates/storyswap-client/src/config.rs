//! Client configuration.

use std::time::Duration;

/// Connection settings shared by the REST client and the live channel.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, e.g. `http://localhost:4000`.
    pub base_url: String,
    /// Explicit WebSocket URL. When unset it is derived from `base_url`
    /// by swapping the scheme.
    pub ws_url: Option<String>,
    /// Poll loop period. The poll is the redundancy path for live channel
    /// loss, so it keeps running for the lifetime of the conversation.
    pub poll_interval: Duration,
    /// Buffer size for outbound channel events.
    pub outbound_buffer_size: usize,
    /// Buffer size for inbound channel events.
    pub inbound_buffer_size: usize,
    /// Buffer size for composer commands.
    pub command_buffer_size: usize,
}

impl ClientConfig {
    /// Create a config with defaults for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// The WebSocket endpoint to connect the live channel to.
    pub fn websocket_url(&self) -> String {
        if let Some(url) = &self.ws_url {
            return url.clone();
        }
        let base = self.base_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{base}")
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            ws_url: None,
            poll_interval: Duration::from_secs(3),
            outbound_buffer_size: 32,
            inbound_buffer_size: 32,
            command_buffer_size: 32,
        }
    }
}
