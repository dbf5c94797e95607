use anyhow::Result;
use std::sync::Arc;

use pfp_governor::{Clock, RateGovernor, ShardedStore, SystemClock};
use pfp_rotator::config::Config;
use pfp_rotator::sweeper::SweepTask;
use pfp_rotator::transport::http::{AppState, HttpTransport};
use pfp_rotator::updater::{Orchestrator, ProfileUpdater};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("pfp_rotator={}", config.log_level).parse()?),
        )
        .init();

    if !config.has_credentials() {
        tracing::warn!(
            "BLUESKY_HANDLE and BLUESKY_APP_PASSWORD must both be set; updates will fail until they are"
        );
    }

    let updater = Arc::new(ProfileUpdater::from_config(&config)?);

    if config.run_once {
        let outcome = updater.update_profile().await?;
        tracing::info!("{}", outcome.message);
        return Ok(());
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = ShardedStore::with_capacity(config.governor.capacity);
    let governor = Arc::new(RateGovernor::from_parts(store, clock));

    let sweeper = SweepTask::spawn(Arc::clone(&governor), config.governor.sweep_interval);

    let state = Arc::new(AppState {
        governor,
        orchestrator: updater,
        public_quota: config.governor.public_quota,
        cron_secret: config.cron_secret.clone(),
    });

    tracing::info!(
        "pfp-rotator started: public quota {} per {:?}, sweep every {:?}",
        config.governor.public_quota.max_requests,
        config.governor.public_quota.window,
        config.governor.sweep_interval
    );

    let transport = HttpTransport::new(&config.http.host, config.http.port)?;
    let result = transport.start(state, shutdown_signal()).await;

    sweeper.stop().await;

    if let Err(e) = &result {
        tracing::error!("HTTP transport failed: {}", e);
    }
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
