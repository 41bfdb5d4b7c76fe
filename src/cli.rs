use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "redemption-monitor",
    about = "real-time monitor for the redemption event feed with reconnect and notification output",
    version
)]
pub struct Args {
    /// WebSocket base URL; the feed lives at <url>/redemptions
    #[arg(short, long, default_value = "ws://localhost:8080/ws")]
    pub url: String,

    /// Bearer token for the feed (falls back to the REALTIME_TOKEN env var)
    #[arg(short, long)]
    pub token: Option<String>,

    /// Redemption ids to watch (repeatable)
    #[arg(long = "redemption", value_name = "ID")]
    pub redemptions: Vec<String>,

    /// User ids to watch (repeatable)
    #[arg(long = "user", value_name = "ID")]
    pub users: Vec<String>,

    /// Subscribe to the fraud alert feed
    #[arg(long)]
    pub fraud_alerts: bool,

    /// Subscribe to aggregate stats updates
    #[arg(long)]
    pub stats: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Enable metrics server
    #[arg(long)]
    pub metrics: bool,

    /// Metrics server port
    #[arg(long, default_value = "9090")]
    pub metrics_port: u16,

    /// Connection timeout in seconds
    #[arg(long, default_value = "10")]
    pub timeout: u64,

    /// Consecutive abnormal closes tolerated before giving up
    #[arg(long, default_value = "5")]
    pub max_attempts: u32,

    /// Base reconnect delay in milliseconds
    #[arg(long, default_value = "1000")]
    pub base_delay_ms: u64,

    /// Upper bound on the reconnect delay in milliseconds
    #[arg(long, default_value = "10000")]
    pub delay_ceiling_ms: u64,

    /// Disable colored output (useful for piping to files)
    #[arg(long)]
    pub no_color: bool,

    /// Quiet mode - only notifications and errors
    #[arg(long)]
    pub quiet: bool,
}
