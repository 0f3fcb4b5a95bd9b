//! Tracing setup.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Falls back to `info` globally and `debug` for the session engine, which
/// logs every attribute access at that level. Calling it twice is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,sessionforge=debug,sessionforge_session=debug")
    });
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
