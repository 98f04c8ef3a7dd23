//! Tracing setup for podvault binaries and test harnesses.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "podvault=info";

/// Initialize tracing with an env-derived filter and stderr output.
///
/// Callers using the `log` facade (the db layer, dependencies) are bridged
/// into tracing. Call once per process; a second call errors.
pub fn init_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_log::LogTracer::init()?;

    let filter = if verbose {
        EnvFilter::new("podvault=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_once() {
        // First call wins; a second call in the same process errors
        // instead of silently stacking subscribers.
        let first = init_logging(false);
        let second = init_logging(true);
        assert!(first.is_ok() || second.is_err());
    }
}
