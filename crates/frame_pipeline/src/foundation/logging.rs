//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Reads the filter from `RUST_LOG`. Calling this more than once is harmless;
/// later calls are ignored.
pub fn init() {
    let _ = env_logger::builder().is_test(cfg!(test)).try_init();
}

/// Initialize logging with an explicit default filter (e.g. `"info"`)
///
/// `RUST_LOG` still takes precedence when it is set.
pub fn init_with_level(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}
