//! Defines helpers for logging

pub use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt::format::Format, EnvFilter};

/// Initialize a logger at the given log level
pub fn setup_system_logger(level: LevelFilter) {
    tracing_subscriber::fmt().event_format(Format::default().pretty()).with_max_level(level).init();
}

/// Configure logging from the environment, defaulting to the given level
///
/// Respects `RUST_LOG` style directives when set
pub fn configure_telemetry(default_level: LevelFilter) {
    let filter =
        EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
