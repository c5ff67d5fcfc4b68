// Bazunia - per-user storage session with a serialized Supabase write queue

pub mod auth;
pub mod backend;
pub mod config;
pub mod legacy;
pub mod runtime_config;
pub mod storage;
pub mod supabase;

pub use backend::{BackendError, StorageBackend, StoredEntry};
pub use config::RuntimeConfig;
pub use storage::{Storage, StorageError};

/// Install the `RUST_LOG`-driven fmt subscriber; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
