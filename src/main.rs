//! Swapfeed Ingester
//!
//! Process entry point. Loads configuration and wires the listener and the
//! ingestion loop together over a bounded channel. An OS signal cancels a
//! shared token observed by every loop, which drives shutdown.

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use swapfeed_ingester::avro::SwapEventCodec;
use swapfeed_ingester::config::Config;
use swapfeed_ingester::health;
use swapfeed_ingester::listener::{Listener, EVENT_CHANNEL_CAPACITY};
use swapfeed_ingester::logctx::LogContext;
use swapfeed_ingester::pipeline::{self, SHUTDOWN_GRACE};
use swapfeed_ingester::publisher::Publisher;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(run_error) = run().await {
        error!(error = format!("{run_error:#}"), "Ingester stopped");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let default_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;
    config.validate().context("validating configuration")?;

    let logctx = LogContext::new("ingester").with_tag("swapfeed");
    info!(
        session_id = %logctx.session_id(),
        category = %logctx.category(),
        rpc_url = %config.rpc_url,
        pair_address = %config.pair_address,
        "Configuration loaded"
    );

    let cancel = CancellationToken::new();

    let health_listener = health::bind(config.app_port)
        .await
        .context("binding health endpoint")?;
    tokio::spawn(health::serve(health_listener, cancel.clone()));

    let codec = SwapEventCodec::new().context("building swap event codec")?;
    let publisher = Publisher::new(&config, codec);

    info!(
        session_id = %logctx.session_id(),
        category = %logctx.category(),
        "Initialising blockchain listener"
    );
    let listener = Listener::connect(
        &config.rpc_url,
        config.pair_address,
        logctx.with_category("listener"),
    )
    .await
    .context("connecting blockchain listener")?;

    let pair_metadata = listener.pair_metadata().clone();
    info!(
        session_id = %logctx.session_id(),
        category = %logctx.category(),
        token0 = %pair_metadata.token0,
        token1 = %pair_metadata.token1,
        "Pair metadata loaded"
    );

    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (result_tx, result_rx) = mpsc::channel(1);

    let listener_cancel = cancel.clone();
    let listener_task = tokio::spawn(async move {
        let result = listener.listen(listener_cancel, event_tx).await;
        let _ = result_tx.send(result).await;
    });

    let signal_cancel = cancel.clone();
    let signal_logctx = logctx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!(
            session_id = %signal_logctx.session_id(),
            category = %signal_logctx.category(),
            "Shutdown signal received"
        );
        signal_cancel.cancel();
    });

    let outcome = pipeline::consume_events(
        cancel.clone(),
        &publisher,
        event_rx,
        result_rx,
        &logctx.with_category("pipeline"),
    )
    .await;

    cancel.cancel();
    if tokio::time::timeout(SHUTDOWN_GRACE, listener_task)
        .await
        .is_err()
    {
        warn!(
            session_id = %logctx.session_id(),
            "Listener did not stop within the shutdown grace period"
        );
    }

    outcome.context("ingestion loop")?;
    Ok(())
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(terminate) => terminate,
            Err(signal_error) => {
                error!(error = %signal_error, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
