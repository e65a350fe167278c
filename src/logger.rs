//! Logging setup shared by the hub and the participant.

use tracing_subscriber::{EnvFilter, fmt};

/// Initialise the tracing subscriber.
///
/// Logs go to stderr so they stay out of the chat display on stdout.
/// `RUST_LOG` overrides `default_level`, which applies to this crate only.
pub fn setup_logger(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}={}",
            env!("CARGO_PKG_NAME").replace('-', "_"),
            default_level
        ))
    });
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
