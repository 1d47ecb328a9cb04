//! coinwire — periodic crypto-news aggregation with a versioned multi-store
//! snapshot and a small read API.
//!
//! Startup order matters: config and logging are fatal, storage clients are
//! fatal, then one scrape runs immediately, the cron schedule takes over,
//! and the API serves the last published snapshot throughout.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use coinwire_common::{config, telemetry};
use coinwire_pipeline::ScrapeTask;
use coinwire_storage::{version_listener, Service};
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info};

mod envelope;
mod routes;

use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config(Path::new("config.toml"))?;
    let _guards = telemetry::init(Path::new("./logs"), &config.api.mode)?;

    info!("Starting server");

    // Read service pinned to the last published version; the listener
    // advances it when a scrape run publishes.
    let service = Arc::new(
        Service::for_reads(&config)
            .await
            .context("Failed to initialize storage service")?,
    );
    let notifier = version_listener(service.clone());

    // Scrape once now, then on the configured schedule.
    let task = Arc::new(ScrapeTask::new(config.clone(), notifier));
    {
        let task = task.clone();
        tokio::spawn(async move {
            if let Err(e) = task.run().await {
                error!(error = %e, "Scrape task failed");
            }
        });
    }

    let scheduler = JobScheduler::new()
        .await
        .context("Failed to create scheduler")?;
    let job = Job::new_async(config.scrapy.crontab.as_str(), move |_uuid, _lock| {
        let task = task.clone();
        Box::pin(async move {
            if let Err(e) = task.run().await {
                error!(error = %e, "Scheduled scrape task failed");
            }
        })
    })
    .context("Invalid crontab expression")?;
    scheduler.add(job).await.context("Failed to add scrape job")?;
    scheduler.start().await.context("Failed to start scheduler")?;
    info!(crontab = %config.scrapy.crontab, "Scrape schedule registered");

    // API server. Release mode enforces read/write timeouts.
    let state = Arc::new(AppState {
        service: service.clone(),
    });
    let mut app = routes::router(state);
    if config.api.mode == "release" {
        app = app.layer(TimeoutLayer::new(Duration::from_secs(15)));
    }

    let listener = tokio::net::TcpListener::bind(&config.api.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.api.addr))?;
    info!(addr = %config.api.addr, mode = %config.api.mode, "API server listening");

    axum::serve(listener, app)
        .await
        .context("API server exited")?;

    Ok(())
}
