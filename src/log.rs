use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over `env_filter`.
pub fn set(env_filter: String) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true)
        .init();
}
