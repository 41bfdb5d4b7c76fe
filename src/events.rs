/// file: src/events.rs
/// description: Event bus that decouples the connection driver from presentation
use crate::notification::NotificationDirective;
use crate::types::EventType;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Connecting { endpoint: String },
    Connected { connection_id: String },
    SubscriptionSent { message: String },
    Reconnecting { attempt: u32, delay_ms: u64 },
    Disconnected { code: Option<u16>, reason: Option<String> },
    Notify {
        event_type: EventType,
        directive: NotificationDirective,
    },
    /// Reconnect budget exhausted; emitted once per outage and, unlike the
    /// other events, awaited rather than dropped when the bus is full.
    ConnectionLost { directive: NotificationDirective },
}

// Bounded so a stalled consumer cannot grow memory without limit.
const EVENT_CHANNEL_CAPACITY: usize = 1_024;

pub type EventSender = mpsc::Sender<ClientEvent>;
pub type EventReceiver = mpsc::Receiver<ClientEvent>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

/// Non-blocking send; a full or closed channel drops the event.
pub(crate) fn emit(sender: Option<&EventSender>, event: ClientEvent) {
    let Some(sender) = sender else {
        return;
    };
    match sender.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            warn!(?event, "Event channel full, dropping client event");
        }
        Err(TrySendError::Closed(_)) => {}
    }
}
