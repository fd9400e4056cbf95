//! Structured logging setup.
//!
//! Events go to stderr so that subcommands printing documents (`descriptor`,
//! `config`) keep stdout clean. `RUST_LOG` takes precedence over the level
//! chosen on the command line.

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for this crate's events
    pub level: Level,

    /// Emit one JSON object per event
    pub use_json: bool,

    /// Include the module target (e.g. `droidci::pipeline`)
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: false,
        }
    }
}

impl LoggingConfig {
    /// Map `-v` repetitions onto a level: none is INFO, one DEBUG, more TRACE.
    pub fn from_verbosity(verbose: u8, use_json: bool) -> Self {
        let level = match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            use_json,
            include_target: verbose > 0,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("warn,droidci={}", self.level)))
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(config: &LoggingConfig) {
    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(config.filter());

        if config.use_json {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(config.include_target)
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_target(config.include_target)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    });
}
