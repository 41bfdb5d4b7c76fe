//! Connection lifecycle and reconnect policy.
//!
//! [`ConnectionMachine`] performs no I/O. The driver feeds it transport
//! callbacks and executes the [`Command`]s it returns, which keeps every
//! transition testable without sockets or timers.
//!
//! Each `start` opens a new *generation*. Callbacks carry the generation they
//! belong to, and callbacks from a generation that has since been stopped are
//! ignored, so an attempt that resolves after `stop` cannot revive the client.

use crate::backoff::BackoffPolicy;
use crate::types::NORMAL_CLOSURE;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Terminal: the reconnect budget is spent and only `start` recovers.
    Errored,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Errored => "errored",
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectContext {
    pub attempt: u32,
    pub max_attempts: u32,
    pub last_close_code: Option<u16>,
    pub last_close_reason: Option<String>,
}

impl ReconnectContext {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            last_close_code: None,
            last_close_reason: None,
        }
    }

    fn record(&mut self, code: Option<u16>, reason: Option<String>) {
        if code.is_some() {
            self.last_close_code = code;
        }
        if reason.is_some() {
            self.last_close_reason = reason;
        }
    }
}

/// Work the driver must carry out after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a transport for `generation`.
    Open { generation: u64 },
    /// Replay every registered subscription on the new transport.
    Replay,
    /// Close the transport with `code`; no reconnect follows.
    Close { code: u16 },
    /// Wait `delay`, then open again.
    ScheduleReconnect { attempt: u32, delay: Duration },
    /// Reconnect budget exhausted; surface the terminal notification.
    Terminal,
}

#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    context: ReconnectContext,
    backoff: BackoffPolicy,
    generation: u64,
}

impl ConnectionMachine {
    pub fn new(max_attempts: u32, backoff: BackoffPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            context: ReconnectContext::new(max_attempts),
            backoff,
            generation: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn context(&self) -> &ReconnectContext {
        &self.context
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// No-op while `Connecting` or `Connected`.
    pub fn start(&mut self) -> Option<Command> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                debug!(state = %self.state, "start ignored, client already active");
                None
            }
            ConnectionState::Disconnected | ConnectionState::Errored => {
                if self.state == ConnectionState::Errored {
                    // Manual recovery grants a fresh reconnect budget.
                    self.context.attempt = 0;
                }
                self.generation += 1;
                self.state = ConnectionState::Connecting;
                info!(generation = self.generation, "Connection starting");
                Some(Command::Open {
                    generation: self.generation,
                })
            }
        }
    }

    /// Safe from any state. Invalidates the running generation.
    pub fn stop(&mut self) -> Option<Command> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                self.generation += 1;
                self.state = ConnectionState::Disconnected;
                info!("Connection stopped by client");
                Some(Command::Close {
                    code: NORMAL_CLOSURE,
                })
            }
            ConnectionState::Errored => {
                self.state = ConnectionState::Disconnected;
                None
            }
            ConnectionState::Disconnected => None,
        }
    }

    pub fn on_open(&mut self, generation: u64) -> Command {
        if !self.is_current(generation) || self.state != ConnectionState::Connecting {
            debug!(generation, "Discarding transport opened by a stopped session");
            return Command::Close {
                code: NORMAL_CLOSURE,
            };
        }
        self.state = ConnectionState::Connected;
        self.context.attempt = 0;
        Command::Replay
    }

    /// Records failure details; the following close drives the transition.
    pub fn on_error(&mut self, generation: u64, code: Option<u16>, reason: Option<String>) {
        if !self.is_current(generation) {
            return;
        }
        warn!(?code, ?reason, "Transport error");
        self.context.record(code, reason);
    }

    pub fn on_close(
        &mut self,
        generation: u64,
        code: u16,
        reason: Option<String>,
    ) -> Option<Command> {
        if !self.is_current(generation) || !self.state.is_active() {
            debug!(generation, code, "Ignoring close for inactive session");
            return None;
        }

        self.context.record(Some(code), reason);

        if code == NORMAL_CLOSURE {
            info!("Transport closed normally");
            self.state = ConnectionState::Disconnected;
            return None;
        }

        if self.context.attempt < self.context.max_attempts {
            self.context.attempt += 1;
        }

        if self.context.attempt >= self.context.max_attempts {
            error!(
                attempts = self.context.attempt,
                close_code = code,
                "Reconnect attempts exhausted, manual refresh required"
            );
            self.state = ConnectionState::Errored;
            return Some(Command::Terminal);
        }

        let delay = self.backoff.next_delay(self.context.attempt);
        warn!(
            attempt = self.context.attempt,
            delay_ms = delay.as_millis() as u64,
            close_code = code,
            "Abnormal close, scheduling reconnect"
        );
        self.state = ConnectionState::Connecting;
        Some(Command::ScheduleReconnect {
            attempt: self.context.attempt,
            delay,
        })
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }
}
