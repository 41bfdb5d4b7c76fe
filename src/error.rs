use crate::types::TopicKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("TLS configuration error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("Malformed frame: {0}")]
    Protocol(String),

    #[error("Maximum reconnection attempts ({max_attempts}) exhausted")]
    ExhaustedRetries { max_attempts: u32 },

    #[error("Consumer callback for {event_type} failed: {message}")]
    Consumer { event_type: String, message: String },

    #[error("Invalid {target} subscription: {reason}")]
    InvalidSubscription { target: TopicKind, reason: String },

    #[error("JSON serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Metrics server error: {0}")]
    Metrics(String),
}

impl RealtimeError {
    /// Errors the reconnect loop absorbs instead of surfacing to callers.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::WebSocket(_) | Self::Timeout | Self::Tls(_)
        )
    }
}
