/// file: src/client_state.rs
/// description: per-client session statistics, kept apart from the connection logic
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientState {
    /// Identifier of the current (or most recent) socket; regenerated per connect.
    pub connection_id: Option<String>,
    pub is_connected: bool,
    pub connections_opened: u64,
    pub total_messages_received: u64,
    pub events_dispatched: u64,
    pub unknown_events: u64,
    pub frames_dropped: u64,
    pub consumer_failures: u64,
    pub last_message_time: Option<DateTime<Utc>>,
    pub last_disconnection_time: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            connection_id: None,
            is_connected: false,
            connections_opened: 0,
            total_messages_received: 0,
            events_dispatched: 0,
            unknown_events: 0,
            frames_dropped: 0,
            consumer_failures: 0,
            last_message_time: None,
            last_disconnection_time: None,
            started_at: None,
        }
    }

    pub fn mark_started(&mut self) {
        self.started_at.get_or_insert_with(Utc::now);
    }

    /// Starts a new connection and returns its id.
    pub fn reset_connection(&mut self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.connection_id = Some(id.clone());
        self.is_connected = true;
        self.connections_opened += 1;
        id
    }

    pub fn record_message(&mut self) {
        self.last_message_time = Some(Utc::now());
        self.total_messages_received += 1;
    }

    pub fn record_dispatch(&mut self, consumer_failures: usize) {
        self.events_dispatched += 1;
        self.consumer_failures += consumer_failures as u64;
    }

    pub fn record_unknown(&mut self) {
        self.unknown_events += 1;
    }

    pub fn record_dropped_frame(&mut self) {
        self.frames_dropped += 1;
    }

    pub fn disconnect(&mut self) {
        if self.is_connected {
            self.last_disconnection_time = Some(Utc::now());
        }
        self.is_connected = false;
    }
}
