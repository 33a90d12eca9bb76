#![forbid(unsafe_code)]

//! Pure job-state synchronisation logic for the `vidnotes` client.
//!
//! Nothing in this crate performs I/O except [`settings`]; the async polling
//! runtime lives in `vidnotes-client-engine`.

pub mod job;
pub mod merge;
pub mod progress;
pub mod selection;
pub mod settings;
pub mod state;

pub use job::{JobId, JobRecord, JobStatus};
pub use merge::merge_snapshots;
pub use progress::{Progress, progress_of};
pub use selection::{AdoptionPolicy, SelectionStabilizer};
pub use state::ClientState;
