//! Logger initialization.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence when set. Otherwise `default_level` is applied to
/// the binary's own crate (`app_name` with `-` replaced by `_`) and to `tower_http`.
///
/// Calling this more than once is harmless: later calls are ignored.
pub fn setup_logger(app_name: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(app_name, default_level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

fn default_filter(app_name: &str, default_level: &str) -> String {
    let crate_name = app_name.replace('-', "_");
    format!("{crate_name}={default_level},plaza_server={default_level},tower_http={default_level}")
}
