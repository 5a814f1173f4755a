//! Tracing bootstrap for binaries embedding the ledger.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,till=debug,sqlx=warn";

/// Installs the global fmt subscriber.
///
/// ## Log Levels
/// - ERROR: durable writes that failed
/// - WARN: operations refused by a ledger rule
/// - INFO: every committed state change
/// - DEBUG: lookups and repository calls
///
/// Returns `false` when a subscriber was already installed (a second call,
/// or a host application that set up its own).
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
