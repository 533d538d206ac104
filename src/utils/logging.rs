use tracing_subscriber::{EnvFilter, fmt};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// crate-wide level from `consts::LOG_LEVEL`.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(crate::utils::consts::LOG_LEVEL));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
