//! # MRI Qube Sync Daemon
//!
//! Entry point for the sync service. By default it runs the background
//! scheduler until interrupted; `--once` runs a single scheduler tick and
//! `--building` runs a full sync for one building.

use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use qube_sync::client::QubeClient;
use qube_sync::config::ConfigLoader;
use qube_sync::db::init_pool;
use qube_sync::migration::{Migrator, MigratorTrait};
use qube_sync::models::EntityKind;
use qube_sync::scheduler::SyncScheduler;
use qube_sync::sync::SyncService;
use qube_sync::telemetry::init_tracing;

#[derive(Debug, Parser)]
#[command(name = "qube-sync", version, about = "Mirrors MRI Qube data into local tables")]
struct Cli {
    /// Run a single scheduler tick and exit
    #[arg(long)]
    once: bool,

    /// Run a full sync for one building, print the report as JSON and exit
    #[arg(long, value_name = "BUILDING_ID", conflicts_with = "once")]
    building: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new().load()?;
    init_tracing(&config)?;

    info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        info!(config = %redacted, "Effective configuration");
    }

    let db = Arc::new(init_pool(&config).await?);
    Migrator::up(db.as_ref(), None).await?;

    let client = Arc::new(QubeClient::new(db.clone(), &config)?);
    if !client.is_configured().await {
        info!("Qube credentials not configured; syncs will fail until they are provided");
    }
    let sync = Arc::new(SyncService::new(client, db.clone()));

    if let Some(building_id) = cli.building {
        let report = sync.sync_building(&building_id).await;
        println!("{}", serde_json::to_string_pretty(&report)?);

        let properties_ok = report
            .reports
            .get(&EntityKind::Properties)
            .map(|pass| pass.success)
            .unwrap_or(false);
        if !properties_ok {
            bail!("properties sync failed for building {building_id}");
        }
        return Ok(());
    }

    let scheduler = SyncScheduler::new(config.scheduler.clone(), db, sync);

    if cli.once {
        let stats = scheduler.tick().await?;
        info!(
            examined = stats.examined,
            triggered = stats.triggered,
            failed = stats.failed,
            "Single scheduler tick finished"
        );
        return Ok(());
    }

    if !config.scheduler.enabled {
        info!("Scheduler disabled by configuration, nothing to run");
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let scheduler_task = tokio::spawn(scheduler.run(shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    shutdown.cancel();
    if let Err(err) = scheduler_task.await {
        error!(error = ?err, "Scheduler task failed to join");
    }

    Ok(())
}
