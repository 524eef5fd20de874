use std::io;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use harmonic_engine::config::{LogConfig, LogFormat};

/// Journaux sur stderr : stdout reste réservé aux tableaux et au JSON.
pub fn init(config: &LogConfig, verbose: bool) -> Result<()> {
    let level: Level = if verbose {
        Level::DEBUG
    } else {
        config
            .level
            .parse()
            .with_context(|| format!("niveau de log invalide : '{}'", config.level))?
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("initialisation des logs impossible : {}", e))
}
