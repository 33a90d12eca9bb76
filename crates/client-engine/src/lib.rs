#![forbid(unsafe_code)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]

//! In-process job synchronisation engine for `vidnotes` (polling, merging, URL adoption).

/// Public API for the engine crate.
pub mod api;

mod backend;
mod engine;

pub use api::{
    EngineConfig, EngineController, EngineEvent, EngineHandle, RefreshMode, StatusSnapshot,
    start_engine,
};
pub use backend::{ErrorKind, HttpJobBackend, JobBackend, SavedNote, SyncError};
