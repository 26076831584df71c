//! Structured logging, initialized once by whoever embeds this core.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Installs a `tracing-subscriber` `fmt` layer filtered by `level` (any
/// valid `EnvFilter` directive, e.g. `"info"` or `"iiod_core=debug"`).
///
/// Safe to call more than once — only the first call takes effect — so
/// both the embedding daemon's startup and every test in this crate can
/// call it unconditionally.
pub fn init(level: &str) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    });
}
