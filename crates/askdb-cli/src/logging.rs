//! Logging setup
//!
//! Everything is written to stderr so stdout carries only the schema document
//! and query results. `RUST_LOG` overrides the default filter.

use serde::Deserialize;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_FILTER: &str =
    "warn,askdb=info,askdb_core=info,askdb_driver_sqlite=info,askdb_ai=info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, colored output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

pub fn init(format: LogFormat) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let layer = match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!(?format, "logging initialized");
    Ok(())
}
