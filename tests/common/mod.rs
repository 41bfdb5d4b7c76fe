#![allow(dead_code)]

use async_trait::async_trait;
use redemption_realtime::{
    RealtimeClient, RealtimeClientBuilder, RealtimeError,
    auth::TokenProvider,
    config::Config,
    events::{ClientEvent, EventReceiver, create_event_channel},
    transport::{Connection, Connector, TransportEvent},
    types::ABNORMAL_CLOSURE,
};
use secrecy::SecretString;
use std::collections::VecDeque;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

pub const WAIT: Duration = Duration::from_secs(60);

/// What the scripted connector does for one connection attempt.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Refuse,
    Accept,
    /// Never resolves, like a handshake that stalls.
    Hang,
}

/// Something the client wrote to a scripted connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text(serde_json::Value),
    Close(u16),
}

/// Test-side end of an accepted connection.
pub struct ServerEnd {
    pub url: Url,
    pub to_client: mpsc::UnboundedSender<TransportEvent>,
    pub from_client: mpsc::UnboundedReceiver<Sent>,
}

impl ServerEnd {
    pub async fn next_sent(&mut self) -> Sent {
        tokio::time::timeout(WAIT, self.from_client.recv())
            .await
            .expect("timed out waiting for client message")
            .expect("client connection dropped")
    }

    pub fn push_text(&self, raw: &str) {
        self.to_client
            .send(TransportEvent::Text(raw.to_string()))
            .expect("client connection dropped");
    }

    pub fn close(&self, code: u16) {
        let _ = self.to_client.send(TransportEvent::Closed { code, reason: None });
    }
}

pub struct ScriptedConnector {
    steps: Mutex<VecDeque<Step>>,
    attempts: AtomicUsize,
    accepted: mpsc::UnboundedSender<ServerEnd>,
}

impl ScriptedConnector {
    /// Attempts beyond the script are refused.
    pub fn new(
        steps: impl IntoIterator<Item = Step>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (accepted, receiver) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            attempts: AtomicUsize::new(0),
            accepted,
        });
        (connector, receiver)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Connection>, RealtimeError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::Refuse);

        match step {
            Step::Refuse => Err(RealtimeError::Transport("connection refused".to_string())),
            Step::Hang => std::future::pending().await,
            Step::Accept => {
                let (to_client, inbound) = mpsc::unbounded_channel();
                let (outbound, from_client) = mpsc::unbounded_channel();
                let _ = self.accepted.send(ServerEnd {
                    url: url.clone(),
                    to_client,
                    from_client,
                });
                Ok(Box::new(ScriptedConnection { inbound, outbound }))
            }
        }
    }
}

struct ScriptedConnection {
    inbound: mpsc::UnboundedReceiver<TransportEvent>,
    outbound: mpsc::UnboundedSender<Sent>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn send_text(&mut self, text: String) -> Result<(), RealtimeError> {
        let value = serde_json::from_str(&text)?;
        self.outbound
            .send(Sent::Text(value))
            .map_err(|_| RealtimeError::Transport("peer gone".to_string()))
    }

    async fn recv(&mut self) -> TransportEvent {
        self.inbound.recv().await.unwrap_or(TransportEvent::Closed {
            code: ABNORMAL_CLOSURE,
            reason: None,
        })
    }

    async fn close(&mut self, code: u16, _reason: &str) -> Result<(), RealtimeError> {
        let _ = self.outbound.send(Sent::Close(code));
        Ok(())
    }
}

/// Hands out `token-1`, `token-2`, ... and counts requests.
#[derive(Default)]
pub struct CountingTokenProvider {
    calls: AtomicUsize,
}

impl CountingTokenProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for CountingTokenProvider {
    async fn bearer_token(&self) -> anyhow::Result<SecretString> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SecretString::from(format!("token-{n}")))
    }
}

pub fn config() -> Arc<Config> {
    Arc::new(Config::new("wss://feed.test/ws").expect("valid config"))
}

pub fn builder(connector: Arc<ScriptedConnector>) -> (RealtimeClientBuilder, EventReceiver) {
    let (sender, receiver) = create_event_channel();
    let builder = RealtimeClient::builder(config())
        .connector(connector)
        .events(sender);
    (builder, receiver)
}

pub async fn accept(accepted: &mut mpsc::UnboundedReceiver<ServerEnd>) -> ServerEnd {
    tokio::time::timeout(WAIT, accepted.recv())
        .await
        .expect("timed out waiting for a connection")
        .expect("connector dropped")
}

/// Waits for the first event matching `predicate`, returning it and everything skipped.
pub async fn wait_for(
    events: &mut EventReceiver,
    predicate: impl Fn(&ClientEvent) -> bool,
) -> (ClientEvent, Vec<ClientEvent>) {
    let mut skipped = Vec::new();
    loop {
        let event = tokio::time::timeout(WAIT, events.recv())
            .await
            .expect("timed out waiting for client event")
            .expect("event channel closed");
        if predicate(&event) {
            return (event, skipped);
        }
        skipped.push(event);
    }
}

pub fn drain(events: &mut EventReceiver) -> Vec<ClientEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
