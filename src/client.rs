// file: src/client.rs
// description: real-time feed client that drives the socket, replays subscriptions and dispatches events
// reference: docs/rustdoc.md

use crate::{
    auth::TokenProvider,
    client_state::ClientState,
    config::Config,
    connection::{Command, ConnectionMachine, ConnectionState, ReconnectContext},
    dispatcher::{DispatchOutcome, DispatcherBuilder, EventDispatcher},
    error::RealtimeError,
    events::{ClientEvent, EventSender, emit},
    monitoring::{
        CONNECTED_GAUGE, CONSUMER_FAILURES_COUNTER, EVENTS_DISPATCHED_COUNTER,
        FRAMES_DROPPED_COUNTER, HealthStatus, MESSAGES_RECEIVED_COUNTER, RECONNECT_COUNTER,
    },
    notification::NotificationDirective,
    registry::SubscriptionRegistry,
    transport::{Connection, Connector, TransportEvent, WsConnector, endpoint_url, feed_url},
    types::{ABNORMAL_CLOSURE, EventType, NORMAL_CLOSURE, OutboundMessage, Subscription, TopicKind},
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use url::Url;

const STOP_REASON: &str = "client stopped";

/// Single-connection client for the redemption event feed.
///
/// All state transitions happen under one mutex, so the client can be shared
/// across tasks, but callbacks run outside it and may call back into the
/// client (e.g. to subscribe).
pub struct RealtimeClient {
    config: Arc<Config>,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
}

pub struct RealtimeClientBuilder {
    config: Arc<Config>,
    dispatcher: DispatcherBuilder,
    events: Option<EventSender>,
    connector: Option<Arc<dyn Connector>>,
}

impl RealtimeClientBuilder {
    pub fn on_redemption_created<F>(self, callback: F) -> Self
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.on_infallible(EventType::RedemptionCreated, callback)
    }

    pub fn on_redemption_flagged<F>(self, callback: F) -> Self
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.on_infallible(EventType::RedemptionFlagged, callback)
    }

    pub fn on_suspicious_activity<F>(self, callback: F) -> Self
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.on_infallible(EventType::SuspiciousActivity, callback)
    }

    pub fn on_fraud_alert<F>(self, callback: F) -> Self
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.on_infallible(EventType::FraudAlert, callback)
    }

    pub fn on_stats_updated<F>(self, callback: F) -> Self
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.on_infallible(EventType::StatsUpdated, callback)
    }

    /// Registers a fallible handler; an `Err` is logged and isolated.
    pub fn on<F>(mut self, event_type: EventType, handler: F) -> Self
    where
        F: Fn(&serde_json::Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.dispatcher = self.dispatcher.on(event_type, handler);
        self
    }

    fn on_infallible<F>(self, event_type: EventType, callback: F) -> Self
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.on(event_type, move |payload| {
            callback(payload);
            Ok(())
        })
    }

    /// Lifecycle events and notification directives go to `sender`.
    pub fn events(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Replaces the default tokio-tungstenite transport.
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn build(self) -> Result<RealtimeClient, RealtimeError> {
        let websocket = &self.config.websocket;
        websocket.validate()?;

        let connector: Arc<dyn Connector> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(WsConnector::new(websocket.connect_timeout)?),
        };

        let dispatcher = match &self.events {
            Some(sender) => self.dispatcher.notify_to(sender.clone()),
            None => self.dispatcher,
        };

        let mut registry = SubscriptionRegistry::new();
        for subscription in &self.config.subscription.initial {
            registry.subscribe(subscription.clone());
        }

        let inner = Inner {
            machine: ConnectionMachine::new(websocket.max_attempts, websocket.backoff),
            registry,
            stats: ClientState::new(),
            outbound: None,
            shutdown: None,
        };

        Ok(RealtimeClient {
            config: self.config,
            connector,
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                dispatcher: dispatcher.build(),
                events: self.events,
            }),
        })
    }
}

impl RealtimeClient {
    pub fn builder(config: Arc<Config>) -> RealtimeClientBuilder {
        RealtimeClientBuilder {
            config,
            dispatcher: EventDispatcher::builder(),
            events: None,
            connector: None,
        }
    }

    /// Begins connecting in the background. No-op while already active.
    ///
    /// Must be called from within a tokio runtime; the connection driver is
    /// spawned onto it.
    pub fn start(&self, credentials: Arc<dyn TokenProvider>) -> Result<(), RealtimeError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            RealtimeError::Config("start must be called within a tokio runtime".to_string())
        })?;

        let mut inner = self.shared.lock();
        let Some(Command::Open { generation }) = inner.machine.start() else {
            return Ok(());
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        if let Some(previous) = inner.shutdown.replace(shutdown_tx) {
            let _ = previous.send(true);
        }
        inner.stats.mark_started();
        drop(inner);

        runtime.spawn(run_session(
            Arc::clone(&self.shared),
            Arc::clone(&self.connector),
            credentials,
            self.config.websocket.base_url.clone(),
            generation,
            shutdown_rx,
        ));
        Ok(())
    }

    /// Stops the client from any state. Pending reconnects are cancelled and
    /// an open socket is closed with the normal-closure code.
    pub fn stop(&self) {
        let mut inner = self.shared.lock();
        let command = inner.machine.stop();
        if let Some(shutdown) = inner.shutdown.take() {
            let _ = shutdown.send(true);
        }
        inner.outbound = None;
        inner.stats.disconnect();
        drop(inner);

        if let Some(Command::Close { code }) = command {
            CONNECTED_GAUGE.set(0.0);
            info!("Real-time client stopped");
            self.shared.emit(ClientEvent::Disconnected {
                code: Some(code),
                reason: Some(STOP_REASON.to_string()),
            });
        }
    }

    pub fn current_state(&self) -> ConnectionState {
        self.shared.lock().machine.state()
    }

    pub fn reconnect_context(&self) -> ReconnectContext {
        self.shared.lock().machine.context().clone()
    }

    /// Registers a topic. Sent at once when connected, otherwise on the next
    /// connect. Returns `false` for a duplicate.
    pub fn subscribe(&self, target: TopicKind, key: Option<&str>) -> Result<bool, RealtimeError> {
        let subscription = Subscription::new(target, key.map(str::to_string))?;
        Ok(self.add_subscription(subscription))
    }

    /// Removes a topic, telling the server when connected. Returns `false`
    /// when the topic was not registered.
    pub fn unsubscribe(&self, target: TopicKind, key: Option<&str>) -> Result<bool, RealtimeError> {
        let subscription = Subscription::new(target, key.map(str::to_string))?;
        Ok(self.remove_subscription(&subscription))
    }

    pub fn add_subscription(&self, subscription: Subscription) -> bool {
        let mut inner = self.shared.lock();
        if !inner.registry.subscribe(subscription.clone()) {
            return false;
        }
        if inner.machine.state() == ConnectionState::Connected {
            inner.send(subscription.subscribe_message());
        } else {
            debug!(%subscription, "Subscription queued until next connect");
        }
        true
    }

    pub fn remove_subscription(&self, subscription: &Subscription) -> bool {
        let mut inner = self.shared.lock();
        if !inner.registry.unsubscribe(subscription) {
            return false;
        }
        if inner.machine.state() == ConnectionState::Connected {
            inner.send(subscription.unsubscribe_message());
        }
        true
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.shared.lock().registry.iter().cloned().collect()
    }

    pub fn stats(&self) -> ClientState {
        self.shared.lock().stats.clone()
    }

    pub fn health(&self) -> HealthStatus {
        let inner = self.shared.lock();
        HealthStatus::new(inner.machine.state(), &inner.stats, inner.machine.context())
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Shared {
    inner: Mutex<Inner>,
    dispatcher: EventDispatcher,
    events: Option<EventSender>,
}

struct Inner {
    machine: ConnectionMachine,
    registry: SubscriptionRegistry,
    stats: ClientState,
    /// Writer queue of the live socket; `Some` only while connected.
    outbound: Option<mpsc::UnboundedSender<String>>,
    shutdown: Option<watch::Sender<bool>>,
}

impl Inner {
    fn send(&self, message: OutboundMessage) {
        let Some(outbound) = &self.outbound else {
            return;
        };
        match message.to_json() {
            Ok(json) => {
                if outbound.send(json).is_err() {
                    debug!("Connection writer gone, message will be replayed on reconnect");
                }
            }
            Err(e) => error!("Failed to serialize subscription message: {}", e),
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ClientEvent) {
        emit(self.events.as_ref(), event);
    }

    /// Marks the session connected and queues the subscription replay.
    /// `None` means the session was stopped while the socket was opening.
    fn connection_opened(&self, generation: u64) -> Option<mpsc::UnboundedReceiver<String>> {
        let mut inner = self.lock();
        if inner.machine.on_open(generation) != Command::Replay {
            return None;
        }

        let (outbound, receiver) = mpsc::unbounded_channel();
        inner.outbound = Some(outbound);
        let mut replayed = 0usize;
        inner.registry.replay_all(|message| {
            inner.send(message);
            replayed += 1;
        });
        let connection_id = inner.stats.reset_connection();
        drop(inner);

        CONNECTED_GAUGE.set(1.0);
        info!(%connection_id, replayed, "Connected to real-time feed");
        self.emit(ClientEvent::Connected { connection_id });
        Some(receiver)
    }

    fn transport_failed(&self, generation: u64, error: &RealtimeError) {
        if error.is_transient() {
            warn!(error = %error, "Transport failure");
        } else {
            error!(error = %error, "Unexpected transport failure");
        }
        self.lock()
            .machine
            .on_error(generation, None, Some(error.to_string()));
    }

    fn connection_closed(&self, generation: u64, code: u16, reason: Option<String>) -> Option<Command> {
        let mut inner = self.lock();
        let current = generation == inner.machine.generation();
        let was_connected = current && inner.machine.state() == ConnectionState::Connected;
        let command = inner.machine.on_close(generation, code, reason.clone());
        if current {
            inner.outbound = None;
            inner.stats.disconnect();
        }
        drop(inner);

        if was_connected {
            CONNECTED_GAUGE.set(0.0);
            self.emit(ClientEvent::Disconnected {
                code: Some(code),
                reason,
            });
        }

        if let Some(Command::ScheduleReconnect { attempt, delay }) = &command {
            RECONNECT_COUNTER.increment(1);
            self.emit(ClientEvent::Reconnecting {
                attempt: *attempt,
                delay_ms: delay.as_millis() as u64,
            });
        }
        command
    }

    /// Delivers the terminal signal with backpressure instead of `emit`, so a
    /// full event bus delays it rather than losing it. Gives up only when the
    /// client is stopped or the receiver is gone.
    async fn announce_connection_lost(&self, shutdown: &mut watch::Receiver<bool>) {
        let Some(events) = &self.events else {
            return;
        };
        let event = ClientEvent::ConnectionLost {
            directive: NotificationDirective::connection_lost(),
        };
        tokio::select! {
            biased;
            _ = shutdown.changed() => debug!("Client stopped before connection loss was delivered"),
            sent = events.send(event) => {
                if sent.is_err() {
                    debug!("Event receiver dropped, connection loss not delivered");
                }
            }
        }
    }

    fn handle_frame(&self, raw: &str) {
        MESSAGES_RECEIVED_COUNTER.increment(1);
        let outcome = self.dispatcher.dispatch(raw);

        let mut inner = self.lock();
        inner.stats.record_message();
        match outcome {
            DispatchOutcome::Dropped(_) => {
                FRAMES_DROPPED_COUNTER.increment(1);
                inner.stats.record_dropped_frame();
            }
            DispatchOutcome::Ignored { .. } => inner.stats.record_unknown(),
            DispatchOutcome::Delivered(delivery) => {
                EVENTS_DISPATCHED_COUNTER.increment(1);
                CONSUMER_FAILURES_COUNTER.increment(delivery.failures.len() as u64);
                inner.stats.record_dispatch(delivery.failures.len());
            }
        }
    }
}

enum SessionEnd {
    Shutdown,
    Closed { code: u16, reason: Option<String> },
}

/// Connect / serve / back off until stopped, closed normally, or exhausted.
async fn run_session(
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    credentials: Arc<dyn TokenProvider>,
    base_url: Url,
    generation: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let attempt = tokio::select! {
            biased;
            _ = shutdown.changed() => return,
            result = open_connection(&shared, connector.as_ref(), credentials.as_ref(), &base_url) => result,
        };

        let (code, reason) = match attempt {
            Ok(mut connection) => match shared.connection_opened(generation) {
                Some(outbound) => {
                    match serve_connection(&shared, generation, connection, outbound, &mut shutdown)
                        .await
                    {
                        SessionEnd::Shutdown => return,
                        SessionEnd::Closed { code, reason } => (code, reason),
                    }
                }
                None => {
                    let _ = connection.close(NORMAL_CLOSURE, STOP_REASON).await;
                    return;
                }
            },
            Err(e) => {
                shared.transport_failed(generation, &e);
                (ABNORMAL_CLOSURE, Some(e.to_string()))
            }
        };

        match shared.connection_closed(generation, code, reason) {
            Some(Command::ScheduleReconnect { delay, .. }) => {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Some(Command::Terminal) => {
                let max_attempts = shared.lock().machine.context().max_attempts;
                let error = RealtimeError::ExhaustedRetries { max_attempts };
                error!(%error, "Real-time updates disabled, refresh required");
                shared.announce_connection_lost(&mut shutdown).await;
                return;
            }
            _ => return,
        }
    }
}

async fn open_connection(
    shared: &Shared,
    connector: &dyn Connector,
    credentials: &dyn TokenProvider,
    base_url: &Url,
) -> Result<Box<dyn Connection>, RealtimeError> {
    let token = credentials
        .bearer_token()
        .await
        .map_err(|e| RealtimeError::Transport(format!("bearer token unavailable: {e}")))?;
    let endpoint = feed_url(base_url)?;
    let url = endpoint_url(base_url, &token)?;

    info!(%endpoint, "Connecting to real-time feed");
    shared.emit(ClientEvent::Connecting {
        endpoint: endpoint.to_string(),
    });
    connector.connect(&url).await
}

async fn serve_connection(
    shared: &Shared,
    generation: u64,
    mut connection: Box<dyn Connection>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if let Err(e) = connection.close(NORMAL_CLOSURE, STOP_REASON).await {
                    debug!(error = %e, "Close handshake failed");
                }
                return SessionEnd::Shutdown;
            }
            Some(message) = outbound.recv() => {
                if let Err(e) = connection.send_text(message.clone()).await {
                    shared.transport_failed(generation, &e);
                    return SessionEnd::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: Some(e.to_string()),
                    };
                }
                debug!(%message, "Sent subscription message");
                shared.emit(ClientEvent::SubscriptionSent { message });
            }
            event = connection.recv() => match event {
                TransportEvent::Text(raw) => shared.handle_frame(&raw),
                TransportEvent::Closed { code, reason } => {
                    return SessionEnd::Closed { code, reason };
                }
                TransportEvent::Error(e) => {
                    shared.transport_failed(generation, &e);
                    return SessionEnd::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: Some(e.to_string()),
                    };
                }
            },
        }
    }
}
