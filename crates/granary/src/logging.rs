use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or empty.
pub fn default_filter(verbose: bool) -> EnvFilter {
    if verbose { EnvFilter::new("debug") } else { EnvFilter::new("info") }
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `verbose`. Calling this twice is a
/// no-op the second time.
pub fn init(verbose: bool) {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) if !value.trim().is_empty() => EnvFilter::new(value),
        _ => default_filter(verbose),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .try_init();
}
