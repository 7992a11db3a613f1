//! Diagnostics via `tracing`, written to stderr.
//!
//! User-facing output (dashboards, results) goes to stdout through `ux` and
//! is unaffected by `RUST_LOG`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Reads `RUST_LOG`, defaulting to `warn`. `debug` raises this crate to `debug`.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::new("warn,vibe_sitegen=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
