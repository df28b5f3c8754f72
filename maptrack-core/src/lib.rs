//! # maptrack-core
//!
//! Core library for maptrack - session and playtime analytics for a game
//! overlay.
//!
//! This library provides:
//! - A crash-safe session store tracking the single active map session
//! - Day-bucketed playtime totals with 90-day retention
//! - Pure analytics facades (ranking, dashboard, library) over snapshots
//! - Storage backends, configuration, and logging infrastructure
//!
//! ## Architecture
//!
//! State flows through three layers:
//! - **Backend:** A key/blob storage trait with a SQLite implementation
//! - **Store:** The in-memory authority; every mutation is queued to the
//!   backend in order by a single writer task
//! - **Facades:** Pure functions over store snapshots, parameterized by
//!   reporting window and an explicit clock
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use maptrack_core::{Config, SessionStore, SqliteBackend};
//!
//! # async fn run() -> maptrack_core::Result<()> {
//! let config = Config::load()?;
//! let backend = Arc::new(SqliteBackend::open(&Config::database_path())?);
//! let store = SessionStore::init(backend, config.store.clone()).await;
//! store.recover();
//! store.start("de_dust2", None);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use storage::{MemoryBackend, SqliteBackend, StorageBackend};
pub use store::SessionStore;
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod protocol;
pub mod storage;
pub mod store;
pub mod timeutil;
pub mod trend;
pub mod types;
