/// file: src/notification.rs
/// description: maps event type and severity to a user-visible notification directive
use crate::types::{EventType, Severity};
use serde::Serialize;

pub const FRAUD_INVESTIGATION_ROUTE: &str = "/fraud/investigations";
pub const FLAGGED_REDEMPTIONS_ROUTE: &str = "/redemptions?flagged=true";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visual {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestedAction {
    pub label: String,
    pub route: String,
}

/// How an event should be surfaced. Rendering is left to the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDirective {
    pub visual: Visual,
    /// Display time; `0` means persistent until dismissed.
    pub duration_ms: u64,
    pub require_interaction: bool,
    pub suggested_action: Option<SuggestedAction>,
}

impl NotificationDirective {
    /// Terminal signal raised once the reconnect budget is exhausted.
    pub fn connection_lost() -> Self {
        Self {
            visual: Visual::Error,
            duration_ms: 0,
            require_interaction: true,
            suggested_action: Some(SuggestedAction {
                label: "Refresh".to_string(),
                route: "/".to_string(),
            }),
        }
    }
}

/// Lookup table from event type to directive. `None` means consumers only.
///
/// The table is keyed on the event type; severity is accepted so callers can
/// pass the full event classification, but every type has a fixed rendering.
pub fn classify(event_type: EventType, _severity: Severity) -> Option<NotificationDirective> {
    match event_type {
        EventType::FraudAlert => Some(NotificationDirective {
            visual: Visual::Error,
            duration_ms: 10_000,
            require_interaction: true,
            suggested_action: Some(SuggestedAction {
                label: "Investigate".to_string(),
                route: FRAUD_INVESTIGATION_ROUTE.to_string(),
            }),
        }),
        EventType::SuspiciousActivity => Some(NotificationDirective {
            visual: Visual::Warning,
            duration_ms: 5_000,
            require_interaction: false,
            suggested_action: Some(SuggestedAction {
                label: "Review".to_string(),
                route: FLAGGED_REDEMPTIONS_ROUTE.to_string(),
            }),
        }),
        EventType::RedemptionCreated => Some(NotificationDirective {
            visual: Visual::Info,
            duration_ms: 3_000,
            require_interaction: false,
            suggested_action: None,
        }),
        EventType::RedemptionFlagged => Some(NotificationDirective {
            visual: Visual::Info,
            duration_ms: 4_000,
            require_interaction: false,
            suggested_action: None,
        }),
        EventType::StatsUpdated => None,
    }
}
