//! Tracing subscriber setup.
//!
//! The filter follows `RUST_LOG` when set and the configured level
//! otherwise. Output is JSON unless `log_format` asks for pretty, and
//! `log::` macros from sqlx and sea-orm are bridged into the same
//! pipeline.

use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;
use thiserror::Error;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::{SubscriberInitExt, TryInitError},
};

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Installs the global subscriber. Calls after the first are no-ops.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    // The bridge has to exist before the first `log::` call from a
    // dependency. A pre-existing logger only costs us those records.
    if let Err(err) = LogTracer::builder()
        .with_max_level(LevelFilter::Trace)
        .init()
    {
        eprintln!("log bridge not installed ({err}), `log::` records will be dropped");
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let format = match config.log_format.as_str() {
        "pretty" => fmt::layer().pretty().boxed(),
        _ => fmt::layer().json().boxed(),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .try_init();
    if let Err(err) = installed {
        INITIALIZED.store(false, Ordering::SeqCst);
        return Err(err.into());
    }

    Ok(())
}
