//! Tracing initialization.
//!
//! Log verbosity comes from `RUST_LOG` (default `info`), e.g.
//!
//! ```bash
//! export RUST_LOG="catalogd=debug,tower_http=info"
//! ```
//!
//! The output format is chosen with `log_format` in the config file: `text` for humans, `json`
//! for log shippers.

use crate::config::LogFormat;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber with an env filter and a fmt layer
pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    info!(?format, "Telemetry initialized");
    Ok(())
}
