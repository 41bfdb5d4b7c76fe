// file: src/transport.rs
// description: socket abstraction and the tokio-tungstenite implementation used in production
// reference: https://docs.rs/tokio-tungstenite/latest/tokio_tungstenite/

use crate::error::RealtimeError;
use crate::types::ABNORMAL_CLOSURE;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    Connector as TlsConnector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config,
    tungstenite::{
        Message,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use tracing::{debug, trace, warn};
use url::Url;

/// Path of the redemption feed relative to the configured base URL.
pub const FEED_PATH: &str = "redemptions";

// Close code reported when the peer's close frame carried no status.
const NO_STATUS_RECEIVED: u16 = 1005;

/// What the driver sees when it polls an open connection.
#[derive(Debug)]
pub enum TransportEvent {
    Text(String),
    Closed { code: u16, reason: Option<String> },
    Error(RealtimeError),
}

/// An open, bidirectional feed connection.
#[async_trait]
pub trait Connection: Send {
    async fn send_text(&mut self, text: String) -> Result<(), RealtimeError>;

    /// Next inbound event. Must be cancel-safe: the driver polls it inside
    /// `tokio::select!` alongside outbound traffic and shutdown.
    async fn recv(&mut self) -> TransportEvent;

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), RealtimeError>;
}

/// Opens connections to the feed endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Connection>, RealtimeError>;
}

/// `<base>/redemptions?token=<bearer>`.
pub fn endpoint_url(base: &Url, token: &SecretString) -> Result<Url, RealtimeError> {
    let mut url = feed_url(base)?;
    url.query_pairs_mut()
        .clear()
        .append_pair("token", token.expose_secret());
    Ok(url)
}

/// The endpoint without credentials, safe to log.
pub fn feed_url(base: &Url) -> Result<Url, RealtimeError> {
    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| RealtimeError::Config(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .push(FEED_PATH);
    Ok(url)
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WsConnector {
    tls: Arc<rustls::ClientConfig>,
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Result<Self, RealtimeError> {
        let tls = rustls::ClientConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()?
        .with_root_certificates(rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        })
        .with_no_client_auth();

        Ok(Self {
            tls: Arc::new(tls),
            connect_timeout,
        })
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Connection>, RealtimeError> {
        let connecting = connect_async_tls_with_config(
            url.as_str(),
            None,
            true,
            Some(TlsConnector::Rustls(Arc::clone(&self.tls))),
        );

        let (stream, response) = tokio::time::timeout(self.connect_timeout, connecting)
            .await
            .map_err(|_| RealtimeError::Timeout)??;

        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WsConnection { stream }))
    }
}

pub struct WsConnection {
    stream: WsStream,
}

#[async_trait]
impl Connection for WsConnection {
    async fn send_text(&mut self, text: String) -> Result<(), RealtimeError> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return TransportEvent::Text(text.as_str().to_owned()),
                Some(Ok(Message::Binary(data))) => {
                    warn!(bytes = data.len(), "Binary frames are not supported, skipping");
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                    trace!("Control frame received");
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (
                            u16::from(frame.code),
                            Some(frame.reason.as_str().to_owned()).filter(|r| !r.is_empty()),
                        ),
                        None => (NO_STATUS_RECEIVED, None),
                    };
                    debug!(code, ?reason, "Received close frame");
                    return TransportEvent::Closed { code, reason };
                }
                Some(Err(e)) => return TransportEvent::Error(e.into()),
                None => {
                    return TransportEvent::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: None,
                    };
                }
            }
        }
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), RealtimeError> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        match self.stream.close(Some(frame)).await {
            Ok(())
            | Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed)
            | Err(tokio_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
