use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber once at process start, the
/// way the teacher's server binary does it: `RUST_LOG` wins if set,
/// otherwise falls back to `default_level`. `json` switches to
/// structured JSON output for production deployments.
pub fn init_tracing(default_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
