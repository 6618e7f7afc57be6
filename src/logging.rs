#![forbid(unsafe_code)]

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::LogConfig;

pub const LOG_ENV: &str = "TASKBOARD_LOG";

/// Filter directive for the configured level raised by `-v` flags.
#[must_use]
pub fn directive(cfg: &LogConfig, verbose: u8) -> String {
    let level = match verbose {
        0 => cfg.level.trim(),
        1 => "debug",
        _ => "trace",
    };
    format!("taskboard={level}")
}

/// Installs the global subscriber, writing to stderr. `TASKBOARD_LOG`
/// takes precedence over config and flags.
pub fn init(cfg: &LogConfig, verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(directive(cfg, verbose)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if cfg.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("logging already initialized: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_overrides_configured_level() {
        let cfg = LogConfig::default();
        assert_eq!(directive(&cfg, 0), "taskboard=warn");
        assert_eq!(directive(&cfg, 1), "taskboard=debug");
        assert_eq!(directive(&cfg, 3), "taskboard=trace");
    }
}
