//! Courtside trigger host
//!
//! Drains the trigger outbox and runs the notification handlers.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use courtside_core::config::{PushConfig, database_path, load_config};
use courtside_server::notifications::{DisabledPushSender, NotificationPipeline, PushSender};
use courtside_server::storage::Store;
use courtside_server::triggers::TriggerRuntime;

const DEFAULT_LOG_FILTER: &str = "courtside_server=info,courtside_functions=info";

#[derive(Parser, Debug)]
#[command(name = "courtside-functions")]
#[command(version, about = "Courtside trigger host - notification records and push fan-out")]
struct Args {
    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Directory holding a `.courtside/settings.json` project override.
    #[arg(long)]
    project_dir: Option<PathBuf>,

    /// FCM service account credentials (JSON).
    #[arg(long, env = "COURTSIDE_FCM_CREDENTIALS")]
    fcm_credentials: Option<PathBuf>,

    /// Outbox poll interval in milliseconds.
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    /// OTLP endpoint for traces and metrics.
    #[cfg(feature = "metrics")]
    #[arg(long, env = "COURTSIDE_OTLP_ENDPOINT")]
    metrics_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    #[cfg(feature = "metrics")]
    let metrics_guard = courtside_core::tracing_init::init_tracing_with_metrics(
        DEFAULT_LOG_FILTER,
        args.log_json,
        args.metrics_endpoint.as_deref(),
    )?;
    #[cfg(not(feature = "metrics"))]
    courtside_core::tracing_init::init_tracing(DEFAULT_LOG_FILTER, args.log_json);

    let mut config = load_config(args.project_dir.as_deref())?;
    if let Some(ms) = args.poll_interval_ms {
        config.triggers.poll_interval_ms = ms;
    }
    if args.fcm_credentials.is_some() {
        config.push.credentials_path.clone_from(&args.fcm_credentials);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        poll_interval_ms = config.triggers.poll_interval_ms,
        "Starting courtside-functions"
    );

    let db_path = args
        .db_path
        .or_else(|| config.store.database_path.clone())
        .or_else(database_path)
        .ok_or_else(|| anyhow::anyhow!("Cannot determine database path; pass --db-path"))?;
    info!(path = %db_path.display(), "Opening store");
    let store = Store::open(&db_path).await?;

    let push = push_sender(&config.push)?;
    let pipeline = NotificationPipeline::new(
        store.clone(),
        push,
        config.push.effective_batch_size(),
    );
    let runtime = Arc::new(TriggerRuntime::new(store, pipeline, config.triggers));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut worker = tokio::spawn({
        let runtime = Arc::clone(&runtime);
        async move { runtime.run(shutdown_rx).await }
    });

    tokio::select! {
        result = &mut worker => {
            result?;
            warn!("Trigger runtime exited unexpectedly");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
            worker.await?;
        }
    }

    #[cfg(feature = "metrics")]
    if let Some(guard) = metrics_guard {
        guard.shutdown()?;
    }

    info!("courtside-functions stopped");
    Ok(())
}

#[cfg(feature = "push-notifications")]
fn push_sender(config: &PushConfig) -> anyhow::Result<Arc<dyn PushSender>> {
    use courtside_server::notifications::FcmClient;

    let Some(path) = &config.credentials_path else {
        warn!("No FCM credentials configured; push delivery disabled");
        return Ok(Arc::new(DisabledPushSender));
    };

    // reqwest is built with `rustls-no-provider`.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let client = FcmClient::from_credentials_file(path)?;
    info!(project_id = client.project_id(), "FCM push delivery enabled");
    Ok(Arc::new(client))
}

#[cfg(not(feature = "push-notifications"))]
#[allow(clippy::unnecessary_wraps)]
fn push_sender(config: &PushConfig) -> anyhow::Result<Arc<dyn PushSender>> {
    if config.credentials_path.is_some() {
        warn!(
            "FCM credentials given but built without push-notifications; push delivery disabled"
        );
    }
    Ok(Arc::new(DisabledPushSender))
}
