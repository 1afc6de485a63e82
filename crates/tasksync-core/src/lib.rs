//! Local-first sync engine for a task service: a cached mirror of projects,
//! items, labels, filters and notes, a queue of pending commands, and the
//! incremental sync that reconciles both with the server.

pub mod cache;
pub mod client;
pub mod command;
pub mod completed;
pub mod config;
pub mod error;
pub mod filters;
pub mod id;
pub mod items;
pub mod labels;
pub mod model;
pub mod notes;
pub mod projects;
pub mod relation;
pub mod serde_util;
pub mod snapshot;
pub mod time;
pub mod transport;

pub use client::{Client, ClientOptions, FULL_SYNC_CURSOR};
pub use error::{Error, Result};
pub use id::Id;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
pub(crate) mod test_env {
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serializes tests that mutate process environment variables.
    pub fn lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
