//! Tracing initialization for embedding binaries.
//!
//! The library itself never installs a subscriber; hosts call [`init`]
//! once at startup. `log` records from the db/storage modules are
//! bridged into tracing via `tracing-log`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber filtered by `RUST_LOG` (default `info`)
/// and bridges `log` records into tracing. Safe to call more than once;
/// later calls are no-ops.
pub fn init() {
    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
