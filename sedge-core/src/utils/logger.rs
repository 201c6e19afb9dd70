use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing for the process. `RUST_LOG` wins over `log_level`
/// when set. Safe to call once; later calls are ignored by the registry.
pub fn init_logger(log_level: &str, json_logs: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_logs {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_thread_names(true))
            .try_init();
    }
}
