//! Structured logging setup for mobuild.
//!
//! Logs go to stderr so that artifact paths printed on stdout stay
//! machine-readable. `RUST_LOG` is honoured on top of the configured level.

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Crates whose events the configured level applies to.
const OWN_TARGETS: &[&str] = &["mobuild", "mobuild_sdk"];

/// Configuration for logging initialization.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for mobuild's own events.
    pub level: Level,

    /// Emit one JSON object per event instead of human-readable lines.
    pub use_json: bool,

    /// Include the module target in each line.
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
    /// Settings from the CLI flags. An explicit `--log-level` wins over
    /// `--verbose`.
    pub fn from_flags(verbose: bool, level: Option<&str>, use_json: bool) -> Self {
        let level = match level {
            Some(name) => parse_level(name),
            None if verbose => Level::DEBUG,
            None => Level::INFO,
        };
        Self {
            level,
            use_json,
            include_target: verbose,
        }
    }

    /// Filter directives for mobuild's own crates at the configured level.
    fn directives(&self) -> Vec<Directive> {
        OWN_TARGETS
            .iter()
            .filter_map(|target| format!("{}={}", target, self.level).parse().ok())
            .collect()
    }
}

/// Parses a log level name, case-insensitively. Unknown names fall back to
/// `INFO`.
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Installs the global subscriber. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config
            .directives()
            .into_iter()
            .fold(EnvFilter::from_default_env(), EnvFilter::add_directive);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target),
                )
                .init();
        }
    });
}
