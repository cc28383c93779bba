//! Log output setup.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Installs a formatted stderr subscriber filtered by `RUST_LOG`.
///
/// Returns `false` if a global subscriber was already set (by an earlier
/// call or by the host application); the existing one is kept.
pub fn init() -> bool {
    init_with(DEFAULT_FILTER)
}

/// Like [`init`], with a custom fallback filter such as
/// `"sponsors=debug,info"`.
pub fn init_with(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
