//! Core library surface for the Movie List Manager TUI.
//!
//! The persistence layer (`db`, `store`) owns the movie table, the
//! `coordinator` turns its live query into a snapshot the `ui` renders, and
//! `config`/`logging` cover process setup for the binary.
pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod store;
pub mod ui;

pub use config::{Config, ThemeMode};
pub use coordinator::{MovieCoordinator, Pending, Snapshot, SnapshotWatcher};
pub use error::StoreError;
pub use models::{Movie, NewMovie, Rating};
pub use store::{LiveQuery, MovieStore};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
