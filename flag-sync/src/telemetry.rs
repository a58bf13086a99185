use tracing_subscriber::fmt;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::Config;

/// Installs the global subscriber for embedders of the engine. Output level comes from
/// RUST_LOG.
///
///   - DEBUG set: pretty colored output with span events
///   - otherwise: one JSON object per line
///
/// Fails if a global subscriber is already installed, which callers running several tests in
/// one process can ignore.
pub fn init_tracing(config: &Config) -> Result<(), TryInitError> {
    let base_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true);

    let log_layer = if *config.debug {
        base_layer
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_ansi(true)
            .with_filter(EnvFilter::from_default_env())
            .boxed()
    } else {
        base_layer
            .json()
            .with_filter(EnvFilter::from_default_env())
            .boxed()
    };

    tracing_subscriber::registry().with(log_layer).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails_instead_of_panicking() {
        let config = Config::default_test_config();

        init_tracing(&config).ok();

        assert!(init_tracing(&config).is_err());
    }
}
