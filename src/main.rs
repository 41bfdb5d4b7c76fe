use anyhow::Result;
use clap::Parser;
use redemption_realtime::{
    RealtimeClient,
    auth::{StaticTokenProvider, TokenProvider},
    cli::Args,
    config::Config,
    events::create_event_channel,
    monitoring::setup_metrics,
    tracing_setup::setup_tracing,
    ui::{UIController, UIOptions},
};
use std::sync::Arc;

use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_tracing(&args.log_level, args.json_logs)?;

    info!(
        "Starting redemption monitor v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = Arc::new(Config::from_args(&args)?);

    if config.metrics.enabled {
        setup_metrics(config.metrics.port).await?;
        info!("Metrics server started on port {}", config.metrics.port);
    }

    let credentials: Arc<dyn TokenProvider> = match &args.token {
        Some(token) => Arc::new(StaticTokenProvider::new(token.clone())),
        None => Arc::new(StaticTokenProvider::from_env()?),
    };

    let (event_sender, event_receiver) = create_event_channel();
    let client = RealtimeClient::builder(Arc::clone(&config))
        .on_redemption_created(|payload| info!(%payload, "Redemption created"))
        .on_redemption_flagged(|payload| info!(%payload, "Redemption flagged"))
        .on_suspicious_activity(|payload| warn!(%payload, "Suspicious activity"))
        .on_fraud_alert(|payload| warn!(%payload, "Fraud alert"))
        .on_stats_updated(|payload| info!(%payload, "Stats updated"))
        .events(event_sender)
        .build()?;

    let mut ui = UIController::new(
        event_receiver,
        UIOptions {
            colored: config.logging.colored,
            quiet: config.logging.quiet,
        },
    );

    client.start(credentials)?;
    info!("Client started. Press Ctrl+C to shutdown...");

    tokio::select! {
        _ = ui.run() => warn!("Real-time feed unavailable, exiting"),
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    client.stop();
    info!(health = %client.health().to_json(), "Client stopped");
    Ok(())
}
