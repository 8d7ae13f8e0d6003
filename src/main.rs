//! Routeglue daemon entry point.

use std::sync::Arc;

use log::{error, info};
use tokio::signal;

use routeglue::config::Settings;
use routeglue::reconcile::Reconciler;
use routeglue::router::HttpRouter;
use routeglue::runtime::DockerRuntime;
use routeglue::scheduler::Scheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Load settings
    let settings = Settings::load()?;
    info!("Starting routeglue with settings: {:?}", settings);

    // Long-lived clients shared by every cycle
    let runtime = DockerRuntime::new(settings.docker_host.as_deref(), settings.slug_label.clone())?;
    let router = HttpRouter::new(&settings.router_api_url)?;

    let reconciler = Reconciler::new(
        Arc::new(runtime),
        Arc::new(router),
        settings.config_path.clone(),
        settings.host_ip.clone(),
    )
    .skip_overlapping(settings.skip_overlapping);

    let scheduler = Scheduler::new(Arc::new(reconciler), settings.interval());
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.run().await {
            error!("Scheduler stopped: {}", e);
        }
    });

    // Graceful Shutdown
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, shutting down...");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    scheduler_handle.abort();

    info!("Shutdown complete.");
    Ok(())
}
