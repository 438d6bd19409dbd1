use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogConfig;

/// install a global subscriber; `RUST_LOG` wins over the configured level.
///
/// Returns false when a subscriber was already installed.
pub fn init(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let builder = fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}
