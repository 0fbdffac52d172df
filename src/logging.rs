use tracing_subscriber::{EnvFilter, fmt};

/// Installs the stderr subscriber used by the binaries. `RUST_LOG` wins over
/// the default `info` level. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
