//! offerloop scheduler
//!
//! Runs coordinator passes over the plans in a service manifest, using an
//! in-process cluster as the offer source.

use std::time::Duration;

use anyhow::{Context, Result};
use offerloop_scheduler::{
    build_coordinator, cluster::LocalCluster, config, manifest::Manifest, worker::SchedulerWorker,
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::from_env()?;

    // Prefer RUST_LOG, fall back to OFFERLOOP_LOG_LEVEL
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting offerloop scheduler");
    info!(
        manifest = %config.manifest_path.display(),
        agents = config.cluster.agents,
        "Configuration loaded"
    );

    let manifest = match Manifest::load(&config.manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Failed to load manifest");
            return Err(e);
        }
    };
    let service = manifest.name.clone();
    let coordinator =
        build_coordinator(manifest.into_plans()).context("failed to build coordinator")?;
    info!(
        service = %service,
        plans = coordinator.plan_managers().len(),
        "Plans loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut worker = SchedulerWorker::new(
        coordinator,
        Box::new(LocalCluster::new(&config.cluster)),
        config.pass_interval,
    )
    .exit_when_idle(config.exit_when_idle);
    let mut worker_handle = tokio::spawn(async move {
        worker.run(shutdown_rx).await;
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = &mut worker_handle => {
            if let Err(e) = result {
                error!(error = %e, "Scheduler worker task panicked");
            }
            info!("Scheduler shutdown complete");
            return Ok(());
        }
    }

    let _ = shutdown_tx.send(true);

    info!("Waiting for scheduler worker to shut down...");
    if let Err(e) = tokio::time::timeout(Duration::from_secs(10), worker_handle).await {
        warn!(error = %e, "Scheduler worker did not shut down in time");
    }

    info!("Scheduler shutdown complete");
    Ok(())
}
