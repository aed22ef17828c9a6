pub mod backend;
pub mod commands;
pub mod config;
pub mod controller;
pub mod directory;
pub mod error;
pub mod events;
pub mod listener;
pub mod mirrors;
pub mod state;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use backend::{BackendError, LocalBackend, RemoteBackend};
pub use config::ClientConfig;
pub use controller::SyncController;
pub use error::{DonationError, SyncError};
pub use state::AppState;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the
/// default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("studyhall_client=debug,studyhall_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
