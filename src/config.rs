/// file: src/config.rs
/// description: Configuration management and CLI argument mapping for the real-time client
use crate::backoff::BackoffPolicy;
use crate::cli::Args;
use crate::connection::DEFAULT_MAX_ATTEMPTS;
use crate::error::RealtimeError;
use crate::types::Subscription;
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Config {
    pub websocket: WebSocketConfig,
    pub subscription: SubscriptionConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
}

#[derive(Debug, Clone, Default)]
pub struct SubscriptionConfig {
    /// Topics registered before the first connect.
    pub initial: Vec<Subscription>,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub colored: bool,
    pub quiet: bool,
}

impl WebSocketConfig {
    pub fn new(base_url: &str) -> Result<Self, RealtimeError> {
        let config = Self {
            base_url: Url::parse(base_url)?,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: BackoffPolicy::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RealtimeError> {
        if !matches!(self.base_url.scheme(), "ws" | "wss") {
            return Err(RealtimeError::Config(format!(
                "Unsupported URL scheme '{}', expected ws or wss",
                self.base_url.scheme()
            )));
        }
        if self.max_attempts == 0 {
            return Err(RealtimeError::Config(
                "max attempts must be at least 1".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(RealtimeError::Config(
                "connect timeout must be > 0".to_string(),
            ));
        }
        self.backoff.validate()
    }
}

impl Config {
    /// Library defaults around a base URL.
    pub fn new(base_url: &str) -> Result<Self, RealtimeError> {
        Ok(Config {
            websocket: WebSocketConfig::new(base_url)?,
            subscription: SubscriptionConfig::default(),
            metrics: MetricsConfig {
                enabled: false,
                port: 9090,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
                colored: true,
                quiet: false,
            },
        })
    }

    pub fn from_args(args: &Args) -> Result<Self, RealtimeError> {
        let websocket = WebSocketConfig {
            base_url: Url::parse(&args.url)?,
            connect_timeout: Duration::from_secs(args.timeout),
            max_attempts: args.max_attempts,
            backoff: BackoffPolicy::new(
                Duration::from_millis(args.base_delay_ms),
                Duration::from_millis(args.delay_ceiling_ms),
            )?,
        };
        websocket.validate()?;

        let mut initial = Vec::new();
        for id in &args.redemptions {
            initial.push(Subscription::redemption(id.clone())?);
        }
        for id in &args.users {
            initial.push(Subscription::user(id.clone())?);
        }
        if args.fraud_alerts {
            initial.push(Subscription::fraud_alerts());
        }
        if args.stats {
            initial.push(Subscription::stats());
        }

        Ok(Config {
            websocket,
            subscription: SubscriptionConfig { initial },
            metrics: MetricsConfig {
                enabled: args.metrics,
                port: args.metrics_port,
            },
            logging: LoggingConfig {
                level: args.log_level.clone(),
                json: args.json_logs,
                colored: !args.no_color,
                quiet: args.quiet,
            },
        })
    }
}
