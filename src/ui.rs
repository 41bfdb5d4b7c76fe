/// file: src/ui.rs
/// description: terminal presentation of client lifecycle events and notification directives
use crate::events::{ClientEvent, EventReceiver};
use crate::notification::{NotificationDirective, Visual};
use crate::types::EventType;
use tracing::debug;

pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const DIM: &'static str = "\x1b[2m";
    pub const WHITE: &'static str = "\x1b[37m";
    pub const BRIGHT_RED: &'static str = "\x1b[91m";
    pub const BRIGHT_GREEN: &'static str = "\x1b[92m";
    pub const BRIGHT_YELLOW: &'static str = "\x1b[93m";
    pub const BRIGHT_BLUE: &'static str = "\x1b[94m";
    pub const BRIGHT_MAGENTA: &'static str = "\x1b[95m";
}

pub struct UIOptions {
    pub colored: bool,
    pub quiet: bool,
}

pub struct UIController {
    event_receiver: EventReceiver,
    colored: bool,
    quiet: bool,
}

impl UIController {
    pub fn new(event_receiver: EventReceiver, options: UIOptions) -> Self {
        Self {
            event_receiver,
            colored: options.colored,
            quiet: options.quiet,
        }
    }

    /// Prints events until the channel closes or the connection is lost for good.
    pub async fn run(&mut self) {
        while let Some(event) = self.event_receiver.recv().await {
            let terminal = matches!(event, ClientEvent::ConnectionLost { .. });
            if let Some(line) = self.render(&event) {
                println!("{line}");
            }
            if terminal {
                break;
            }
        }
    }

    /// One status line per event; `None` when quiet mode hides it.
    pub fn render(&self, event: &ClientEvent) -> Option<String> {
        match event {
            ClientEvent::Connecting { endpoint } => self.status("CONNECTING", endpoint),
            ClientEvent::Connected { connection_id } => {
                self.status("CONNECTED", &format!("ID: {connection_id}"))
            }
            ClientEvent::SubscriptionSent { message } => {
                debug!(%message, "Subscription sent");
                self.status("SUBSCRIBING", message)
            }
            ClientEvent::Reconnecting { attempt, delay_ms } => Some(format!(
                "{}[RECONNECTING]{} > Attempt {} in {}ms...",
                self.paint(Colors::BRIGHT_YELLOW),
                self.paint(Colors::RESET),
                attempt,
                delay_ms
            )),
            ClientEvent::Disconnected { code, reason } => {
                let detail = match (code, reason) {
                    (Some(code), Some(reason)) => format!("code {code}: {reason}"),
                    (Some(code), None) => format!("code {code}"),
                    _ => "connection closed".to_string(),
                };
                self.status("DISCONNECTED", &detail)
            }
            ClientEvent::Notify {
                event_type,
                directive,
            } => Some(self.notification(Some(*event_type), directive)),
            ClientEvent::ConnectionLost { directive } => Some(self.notification(None, directive)),
        }
    }

    fn status(&self, status: &str, message: &str) -> Option<String> {
        if self.quiet {
            return None;
        }

        let color = match status {
            "CONNECTING" => Colors::BRIGHT_YELLOW,
            "CONNECTED" => Colors::BRIGHT_GREEN,
            "SUBSCRIBING" => Colors::BRIGHT_MAGENTA,
            "DISCONNECTED" => Colors::BRIGHT_RED,
            _ => Colors::WHITE,
        };

        Some(format!(
            "{}{}[{}]{} {}",
            self.paint(Colors::BOLD),
            self.paint(color),
            status,
            self.paint(Colors::RESET),
            message
        ))
    }

    fn notification(&self, event_type: Option<EventType>, directive: &NotificationDirective) -> String {
        let color = match directive.visual {
            Visual::Info => Colors::BRIGHT_BLUE,
            Visual::Warning => Colors::BRIGHT_YELLOW,
            Visual::Error => Colors::BRIGHT_RED,
        };
        let title = match event_type {
            Some(EventType::FraudAlert) => "Fraud alert",
            Some(EventType::SuspiciousActivity) => "Suspicious activity detected",
            Some(EventType::RedemptionCreated) => "New redemption",
            Some(EventType::RedemptionFlagged) => "Redemption flagged",
            Some(EventType::StatsUpdated) => "Stats updated",
            None => "Real-time updates disabled - refresh required",
        };

        let mut line = format!(
            "{}{}[{}]{} {}",
            self.paint(Colors::BOLD),
            self.paint(color),
            format!("{:?}", directive.visual).to_uppercase(),
            self.paint(Colors::RESET),
            title
        );
        if directive.require_interaction {
            line.push_str(" (action required)");
        }
        if let Some(action) = &directive.suggested_action {
            line.push_str(&format!(
                " {}-> {} {}{}",
                self.paint(Colors::DIM),
                action.label,
                action.route,
                self.paint(Colors::RESET)
            ));
        }
        line
    }

    fn paint(&self, code: &'static str) -> &'static str {
        if self.colored { code } else { "" }
    }
}
