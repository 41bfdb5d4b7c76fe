use crate::client_state::ClientState;
use crate::connection::{ConnectionState, ReconnectContext};
use crate::error::RealtimeError;
use anyhow::Result;
use metrics::{Counter, Gauge, counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, sync::LazyLock};
use tracing::{error, info};

// Global metrics
pub static MESSAGES_RECEIVED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("realtime_messages_received_total"));
pub static EVENTS_DISPATCHED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("realtime_events_dispatched_total"));
pub static FRAMES_DROPPED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("realtime_frames_dropped_total"));
pub static CONSUMER_FAILURES_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("realtime_consumer_failures_total"));
pub static RECONNECT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("realtime_reconnects_total"));
pub static CONNECTED_GAUGE: LazyLock<Gauge> = LazyLock::new(|| gauge!("realtime_connected"));

pub async fn setup_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", "redemption-realtime")
        .add_global_label("version", env!("CARGO_PKG_VERSION"));

    match builder.install() {
        Ok(()) => {
            info!(
                "Prometheus metrics server started on http://{}/metrics",
                addr
            );

            MESSAGES_RECEIVED_COUNTER.absolute(0);
            EVENTS_DISPATCHED_COUNTER.absolute(0);
            FRAMES_DROPPED_COUNTER.absolute(0);
            CONSUMER_FAILURES_COUNTER.absolute(0);
            RECONNECT_COUNTER.absolute(0);
            CONNECTED_GAUGE.set(0.0);

            Ok(())
        }
        Err(e) => {
            error!("Failed to start metrics server: {}", e);
            Err(RealtimeError::Metrics(e.to_string()).into())
        }
    }
}

#[derive(Debug)]
pub struct HealthStatus {
    pub state: ConnectionState,
    pub is_healthy: bool,
    pub connection_id: Option<String>,
    pub last_message_time: Option<chrono::DateTime<chrono::Utc>>,
    pub total_messages: u64,
    pub frames_dropped: u64,
    pub consumer_failures: u64,
    pub reconnect_attempt: u32,
    pub uptime: chrono::Duration,
}

impl HealthStatus {
    pub fn new(state: ConnectionState, stats: &ClientState, reconnect: &ReconnectContext) -> Self {
        let uptime = stats
            .started_at
            .map(|started| chrono::Utc::now() - started)
            .unwrap_or_else(chrono::Duration::zero);

        Self {
            state,
            is_healthy: state == ConnectionState::Connected,
            connection_id: stats.connection_id.clone(),
            last_message_time: stats.last_message_time,
            total_messages: stats.total_messages_received,
            frames_dropped: stats.frames_dropped,
            consumer_failures: stats.consumer_failures,
            reconnect_attempt: reconnect.attempt,
            uptime,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": if self.is_healthy { "healthy" } else { "unhealthy" },
            "state": self.state.as_str(),
            "connection_id": self.connection_id,
            "last_message_time": self.last_message_time,
            "total_messages": self.total_messages,
            "frames_dropped": self.frames_dropped,
            "consumer_failures": self.consumer_failures,
            "reconnect_attempt": self.reconnect_attempt,
            "uptime_seconds": self.uptime.num_seconds(),
            "timestamp": chrono::Utc::now()
        })
    }
}
