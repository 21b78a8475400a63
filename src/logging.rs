//! Tracing subscriber setup shared by the binaries

use crate::config::LoggingConfig;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `targets` are logged at the
/// configured level.
pub fn init(config: &LoggingConfig, targets: &[&str]) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let mut filter = EnvFilter::new("warn");
            for target in targets {
                filter = filter.add_directive(format!("{}={}", target, config.level).parse()?);
            }
            filter
        }
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match config.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.try_init(),
    };

    installed.map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}
