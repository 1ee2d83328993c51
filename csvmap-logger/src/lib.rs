use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use tracing_subscriber::util::TryInitError;

/// Install the global subscriber. `RUST_LOG` takes precedence over `CSVMAP_LOG_LEVEL`.
pub fn init() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(&csvmap_config::CONFIG.log_level))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

/// Same as [`init`] but routes output through the libtest capture. Safe to call from every test.
pub fn init_test() {
    let _ = tracing_subscriber::registry()
        .with(env_filter("debug"))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn env_filter(fallback_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(fallback_level)))
}

fn level_directive(level: &str) -> &'static str {
    match level.to_ascii_uppercase().as_str() {
        "ERROR" => "error",
        "WARN" => "warn",
        "INFO" => "info",
        "DEBUG" => "debug",
        "TRACE" => "trace",
        _ => "info",
    }
}
