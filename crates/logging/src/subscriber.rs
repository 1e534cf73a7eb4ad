//! crates/logging/src/subscriber.rs
//! Subscriber initialisation from an explicit verbosity.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

use crate::Verbosity;

/// Error returned when a global subscriber is already installed.
pub use tracing_subscriber::util::TryInitError as InitError;

/// Builds the filter for `verbosity`, letting `RUST_LOG` override it.
#[must_use]
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directives()))
}

/// Installs a formatted stderr subscriber filtered by `verbosity`.
///
/// Fails if a global subscriber was already set.
pub fn try_init_tracing(verbosity: Verbosity) -> Result<(), InitError> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish()
        .try_init()
}

/// Like [`try_init_tracing`], but ignores an already-installed subscriber.
pub fn init_tracing(verbosity: Verbosity) {
    if try_init_tracing(verbosity).is_err() {
        tracing::debug!(target: "respatch", "tracing subscriber already installed");
    }
}
