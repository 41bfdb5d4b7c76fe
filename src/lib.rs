#![doc = include_str!("../docs/rustdoc.md")]

/// Bearer token collaborators.
pub mod auth;
/// Reconnect delay computation.
pub mod backoff;
/// Command-line argument definitions.
pub mod cli;
/// Public client and the connection driver.
pub mod client;
/// Per-client session statistics.
pub mod client_state;
/// Runtime configuration model.
pub mod config;
/// Connection state machine and reconnect accounting.
pub mod connection;
/// Frame decoding and consumer routing.
pub mod dispatcher;
/// Error types used across the crate.
pub mod error;
/// Event bus messages between client and UI.
pub mod events;
/// Metrics and health status structures.
pub mod monitoring;
/// Event-to-notification policy table.
pub mod notification;
/// Ordered subscription set.
pub mod registry;
/// Tracing/logging initialization.
pub mod tracing_setup;
/// Socket abstraction and WebSocket transport.
pub mod transport;
/// Wire protocol data models.
pub mod types;
/// Terminal presentation of client events.
pub mod ui;

/// Primary crate error type.
pub use error::RealtimeError;

pub use client::{RealtimeClient, RealtimeClientBuilder};
pub use connection::{ConnectionState, ReconnectContext};
pub use notification::NotificationDirective;
pub use types::{EventType, Severity, Subscription, TopicKind};
