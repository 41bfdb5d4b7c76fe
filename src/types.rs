/// file: src/types.rs
/// description: wire-level data model for the redemption event feed (topics, inbound events, outbound subscription messages)
use crate::error::RealtimeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Close code sent when the client shuts the socket down on purpose.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Close code recorded when the socket drops without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Subscription targets understood by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicKind {
    Redemption,
    User,
    FraudAlerts,
    Stats,
}

impl TopicKind {
    /// Topics that address one resource and therefore need a key.
    pub fn is_keyed(self) -> bool {
        matches!(self, Self::Redemption | Self::User)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Redemption => "redemption",
            Self::User => "user",
            Self::FraudAlerts => "fraud_alerts",
            Self::Stats => "stats",
        }
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the subscription set, unique by `(target, key)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    target: TopicKind,
    key: Option<String>,
}

impl Subscription {
    /// Builds a subscription, rejecting keyed topics without a key.
    ///
    /// Client-wide topics (`FraudAlerts`, `Stats`) discard any key so that
    /// `(FraudAlerts, Some("x"))` and `(FraudAlerts, None)` are the same entry.
    pub fn new(target: TopicKind, key: Option<String>) -> Result<Self, RealtimeError> {
        if !target.is_keyed() {
            return Ok(Self { target, key: None });
        }
        match key {
            Some(key) if !key.trim().is_empty() => Ok(Self {
                target,
                key: Some(key),
            }),
            _ => Err(RealtimeError::InvalidSubscription {
                target,
                reason: "a resource id is required".to_string(),
            }),
        }
    }

    pub fn redemption(id: impl Into<String>) -> Result<Self, RealtimeError> {
        Self::new(TopicKind::Redemption, Some(id.into()))
    }

    pub fn user(id: impl Into<String>) -> Result<Self, RealtimeError> {
        Self::new(TopicKind::User, Some(id.into()))
    }

    pub fn fraud_alerts() -> Self {
        Self {
            target: TopicKind::FraudAlerts,
            key: None,
        }
    }

    pub fn stats() -> Self {
        Self {
            target: TopicKind::Stats,
            key: None,
        }
    }

    pub fn target(&self) -> TopicKind {
        self.target
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn subscribe_message(&self) -> OutboundMessage {
        OutboundMessage::new(SubscriptionAction::Subscribe, self)
    }

    pub fn unsubscribe_message(&self) -> OutboundMessage {
        OutboundMessage::new(SubscriptionAction::Unsubscribe, self)
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}:{}", self.target, key),
            None => write!(f, "{}", self.target),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionAction {
    Subscribe,
    Unsubscribe,
}

/// Outbound `subscribe` / `unsubscribe` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub action: SubscriptionAction,
    pub target: TopicKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redemption_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl OutboundMessage {
    fn new(action: SubscriptionAction, subscription: &Subscription) -> Self {
        let key = subscription.key.clone();
        let (redemption_id, user_id) = match subscription.target {
            TopicKind::Redemption => (key, None),
            TopicKind::User => (None, key),
            TopicKind::FraudAlerts | TopicKind::Stats => (None, None),
        };
        Self {
            action,
            target: subscription.target,
            redemption_id,
            user_id,
        }
    }

    pub fn to_json(&self) -> Result<String, RealtimeError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Closed set of event types the dispatcher routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RedemptionCreated,
    RedemptionFlagged,
    SuspiciousActivity,
    FraudAlert,
    StatsUpdated,
}

impl EventType {
    pub const ALL: [EventType; 5] = [
        Self::RedemptionCreated,
        Self::RedemptionFlagged,
        Self::SuspiciousActivity,
        Self::FraudAlert,
        Self::StatsUpdated,
    ];

    /// Maps a wire name to a known type; `None` for forward-compatible unknowns.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "redemption_created" => Some(Self::RedemptionCreated),
            "redemption_flagged" => Some(Self::RedemptionFlagged),
            "suspicious_activity" => Some(Self::SuspiciousActivity),
            "fraud_alert" => Some(Self::FraudAlert),
            "stats_updated" => Some(Self::StatsUpdated),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RedemptionCreated => "redemption_created",
            Self::RedemptionFlagged => "redemption_flagged",
            Self::SuspiciousActivity => "suspicious_activity",
            Self::FraudAlert => "fraud_alert",
            Self::StatsUpdated => "stats_updated",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Self::Info, Self::Warning, Self::Error];
}

/// A decoded, routable event.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub event_type: EventType,
    pub payload: serde_json::Value,
    pub severity: Severity,
    pub timestamp: Option<DateTime<Utc>>,
}

// The frame shape before the type name is resolved. Only `type` is checked
// here; severity and timestamp are validated once the type is known, so a
// newer server's frame stays an unknown event rather than a malformed one.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    payload: serde_json::Value,
    #[serde(default)]
    severity: serde_json::Value,
    #[serde(default)]
    timestamp: serde_json::Value,
}

fn optional_field<T>(name: &str, value: serde_json::Value) -> Result<Option<T>, RealtimeError>
where
    T: serde::de::DeserializeOwned,
{
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| RealtimeError::Protocol(format!("invalid {name}: {e}")))
}

/// Result of decoding one text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedFrame {
    Event(InboundEvent),
    Unknown { event_type: String },
}

impl InboundEvent {
    pub fn decode(raw: &str) -> Result<DecodedFrame, RealtimeError> {
        let frame: RawFrame =
            serde_json::from_str(raw).map_err(|e| RealtimeError::Protocol(e.to_string()))?;

        let Some(event_type) = EventType::from_wire(&frame.event_type) else {
            return Ok(DecodedFrame::Unknown {
                event_type: frame.event_type,
            });
        };

        Ok(DecodedFrame::Event(InboundEvent {
            event_type,
            payload: frame.payload,
            severity: optional_field("severity", frame.severity)?.unwrap_or_default(),
            timestamp: optional_field("timestamp", frame.timestamp)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribe_message_for_redemption_carries_redemption_id() {
        let sub = Subscription::redemption("r1").unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&sub.subscribe_message().to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "subscribe", "target": "redemption", "redemptionId": "r1"})
        );
    }

    #[test]
    fn test_unsubscribe_message_for_user_carries_user_id() {
        let sub = Subscription::user("u7").unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&sub.unsubscribe_message().to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "unsubscribe", "target": "user", "userId": "u7"})
        );
    }

    #[test]
    fn test_client_wide_topics_have_no_ids() {
        let value = serde_json::to_value(Subscription::fraud_alerts().subscribe_message()).unwrap();
        assert_eq!(value, json!({"type": "subscribe", "target": "fraud_alerts"}));

        let value = serde_json::to_value(Subscription::stats().subscribe_message()).unwrap();
        assert_eq!(value, json!({"type": "subscribe", "target": "stats"}));
    }

    #[test]
    fn test_keyed_topic_requires_key() {
        assert!(Subscription::new(TopicKind::Redemption, None).is_err());
        assert!(Subscription::new(TopicKind::User, Some("  ".to_string())).is_err());
    }

    #[test]
    fn test_client_wide_topic_discards_key() {
        let sub = Subscription::new(TopicKind::Stats, Some("ignored".to_string())).unwrap();
        assert_eq!(sub, Subscription::stats());
        assert_eq!(sub.key(), None);
    }

    #[test]
    fn test_decode_known_event() {
        let raw = r#"{"type":"fraud_alert","payload":{"message":"x"},"severity":"error","timestamp":"2024-05-01T12:00:00Z"}"#;
        let DecodedFrame::Event(event) = InboundEvent::decode(raw).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.event_type, EventType::FraudAlert);
        assert_eq!(event.severity, Severity::Error);
        assert_eq!(event.payload, json!({"message": "x"}));
        assert!(event.timestamp.is_some());
    }

    #[test]
    fn test_decode_defaults_missing_severity_and_timestamp() {
        let raw = r#"{"type":"stats_updated","payload":{"total":3}}"#;
        let DecodedFrame::Event(event) = InboundEvent::decode(raw).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.severity, Severity::Info);
        assert_eq!(event.timestamp, None);
    }

    #[test]
    fn test_decode_unknown_type() {
        let decoded = InboundEvent::decode(r#"{"type":"coupon_expired","payload":{}}"#).unwrap();
        assert_eq!(
            decoded,
            DecodedFrame::Unknown {
                event_type: "coupon_expired".to_string()
            }
        );
    }

    #[test]
    fn test_decode_unknown_type_ignores_unfamiliar_fields() {
        let raw = r#"{"type":"new_feed","severity":"critical","timestamp":1714564800}"#;
        assert_eq!(
            InboundEvent::decode(raw).unwrap(),
            DecodedFrame::Unknown {
                event_type: "new_feed".to_string()
            }
        );
    }

    #[test]
    fn test_decode_null_severity_defaults_to_info() {
        let raw = r#"{"type":"redemption_flagged","severity":null,"timestamp":null}"#;
        let DecodedFrame::Event(event) = InboundEvent::decode(raw).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.severity, Severity::Info);
        assert_eq!(event.timestamp, None);
    }

    #[test]
    fn test_decode_malformed_is_protocol_error() {
        for raw in [
            "not json",
            "{}",
            r#"{"type":5}"#,
            r#"{"type":"fraud_alert","severity":"fatal"}"#,
            r#"{"type":"stats_updated","timestamp":"yesterday"}"#,
        ] {
            assert!(matches!(
                InboundEvent::decode(raw),
                Err(RealtimeError::Protocol(_))
            ));
        }
    }

    #[test]
    fn test_event_type_wire_names_round_trip() {
        for event_type in EventType::ALL {
            assert_eq!(EventType::from_wire(event_type.as_str()), Some(event_type));
        }
    }
}
