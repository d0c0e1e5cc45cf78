//! Tracing subscriber setup for host applications.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset and the caller has no preference.
pub const DEFAULT_DIRECTIVE: &str = "comforter=info,reqwest=warn";

/// Install a stderr fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive`.
///
/// Returns false if a global subscriber was already installed.
pub fn init(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
