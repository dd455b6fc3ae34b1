// Logging module - Logging infrastructure
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use std::io;

/// Filter directive for the given settings. `RUST_LOG` is not consulted here.
pub fn filter_directive(log_level: &str, verbose: bool, quiet: bool) -> String {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        log_level
    };
    format!("xbee_cli={},warn", level)
}

/// Initialize logging system.
///
/// `RUST_LOG` wins when set. Logs go to stderr so stdout only carries
/// command output.
pub fn init_logging(log_level: &str, verbose: bool, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(log_level, verbose, quiet)))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(verbose)
                .with_level(true)
        )
        .try_init()?;

    tracing::debug!("Logging initialized");
    Ok(())
}
