//! Decodes inbound frames and routes them to consumer callbacks.
//!
//! Handlers are registered per [`EventType`] when the dispatcher is built and
//! run in registration order. Each invocation is isolated: an `Err` or a panic
//! from one handler is logged and counted, and the remaining handlers and the
//! notification policy still run.

use crate::error::RealtimeError;
use crate::events::{ClientEvent, EventSender, emit};
use crate::notification::{NotificationDirective, classify};
use crate::types::{DecodedFrame, EventType, InboundEvent, Severity};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

pub type EventHandler = Arc<dyn Fn(&serde_json::Value) -> anyhow::Result<()> + Send + Sync>;

#[derive(Debug)]
pub enum DispatchOutcome {
    /// The frame could not be decoded.
    Dropped(RealtimeError),
    /// Well-formed frame with a type this client does not know.
    Ignored { event_type: String },
    Delivered(Delivery),
}

#[derive(Debug)]
pub struct Delivery {
    pub event_type: EventType,
    pub severity: Severity,
    pub handlers_invoked: usize,
    pub failures: Vec<RealtimeError>,
    pub directive: Option<NotificationDirective>,
}

#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: HashMap<EventType, Vec<EventHandler>>,
    notifications: Option<EventSender>,
}

impl DispatcherBuilder {
    pub fn on<F>(mut self, event_type: EventType, handler: F) -> Self
    where
        F: Fn(&serde_json::Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers
            .entry(event_type)
            .or_default()
            .push(Arc::new(handler));
        self
    }

    /// Where notification directives are delivered.
    pub fn notify_to(mut self, sender: EventSender) -> Self {
        self.notifications = Some(sender);
        self
    }

    pub fn build(self) -> EventDispatcher {
        EventDispatcher {
            handlers: self.handlers,
            notifications: self.notifications,
        }
    }
}

pub struct EventDispatcher {
    handlers: HashMap<EventType, Vec<EventHandler>>,
    notifications: Option<EventSender>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<_, _> = self
            .handlers
            .iter()
            .map(|(event_type, handlers)| (*event_type, handlers.len()))
            .collect();
        f.debug_struct("EventDispatcher")
            .field("handlers", &counts)
            .field("notifications", &self.notifications.is_some())
            .finish()
    }
}

impl EventDispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers.get(&event_type).map_or(0, Vec::len)
    }

    /// Never fails; problems are reported in the outcome and the logs.
    pub fn dispatch(&self, raw_frame: &str) -> DispatchOutcome {
        let event = match InboundEvent::decode(raw_frame) {
            Ok(DecodedFrame::Event(event)) => event,
            Ok(DecodedFrame::Unknown { event_type }) => {
                debug!(%event_type, "Ignoring event of unknown type");
                return DispatchOutcome::Ignored { event_type };
            }
            Err(e) => {
                warn!(
                    error = %e,
                    frame = %raw_frame.chars().take(100).collect::<String>(),
                    "Dropping malformed frame"
                );
                return DispatchOutcome::Dropped(e);
            }
        };

        trace!(event_type = %event.event_type, severity = ?event.severity, "Dispatching event");

        let handlers = self
            .handlers
            .get(&event.event_type)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let failures: Vec<RealtimeError> = handlers
            .iter()
            .filter_map(|handler| invoke(handler, &event).err())
            .collect();

        let directive = classify(event.event_type, event.severity);
        if let Some(directive) = &directive {
            emit(
                self.notifications.as_ref(),
                ClientEvent::Notify {
                    event_type: event.event_type,
                    directive: directive.clone(),
                },
            );
        }

        DispatchOutcome::Delivered(Delivery {
            event_type: event.event_type,
            severity: event.severity,
            handlers_invoked: handlers.len(),
            failures,
            directive,
        })
    }
}

fn invoke(handler: &EventHandler, event: &InboundEvent) -> Result<(), RealtimeError> {
    let outcome = catch_unwind(AssertUnwindSafe(|| handler(&event.payload)));
    let message = match outcome {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(e)) => e.to_string(),
        Err(panic) => panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "handler panicked".to_string()),
    };
    error!(event_type = %event.event_type, %message, "Consumer callback failed");
    Err(RealtimeError::Consumer {
        event_type: event.event_type.to_string(),
        message,
    })
}
