use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the fmt subscriber. `RUST_LOG` wins over `level`; an invalid
/// `level` falls back to `info`. Calling this twice is harmless.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}
