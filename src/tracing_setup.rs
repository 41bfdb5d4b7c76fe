// file: src/tracing_setup.rs
// description: structured logging for the client library and the monitor binary
// reference: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log targets owned by this package: the library crate and the
/// `redemption-monitor` binary. Dependencies (tungstenite, rustls) stay at
/// their default `error` level unless `RUST_LOG` says otherwise.
pub const LOG_TARGETS: [&str; 2] = ["redemption_realtime", "redemption_monitor"];

/// Filter directives applying `log_level` to every package target.
pub fn default_directives(log_level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={log_level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// `RUST_LOG` wins over `--log-level`; an unparsable level falls back to info.
pub fn setup_tracing(log_level: &str, json_logs: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(log_level)))
        .unwrap_or_else(|_| EnvFilter::new(default_directives("info")));

    // Reconnect and dispatch logs carry their context as fields (attempt,
    // delay_ms, close_code, event_type), so JSON output flattens them for
    // log shippers instead of nesting spans.
    let fmt_layer = if json_logs {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).compact().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
