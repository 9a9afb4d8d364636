//! Structured logging setup.
//!
//! Every component logs through `tracing`; this module installs the global
//! subscriber for binaries embedding the desk. `RUST_LOG` overrides the
//! default directive.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::TryInitError;

/// Installs a formatted subscriber filtered at `level` for this crate and
/// `warn` for everything else.
///
/// # Errors
///
/// Returns [`TryInitError`] when a global subscriber is already installed.
pub fn init_tracing(level: &str) -> Result<(), TryInitError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("switchboard={level},warn")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
}
