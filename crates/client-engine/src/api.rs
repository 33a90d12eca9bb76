//! Public API types for the in-process `vidnotes` sync engine.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vidnotes_client_core::{AdoptionPolicy, JobId, JobRecord, Progress, progress_of};

use crate::backend::{JobBackend, SavedNote, SyncError};
use crate::engine::{EngineCommand, EngineInner};

/// Configuration for the in-process engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Background polling period.
    pub poll_interval: Duration,

    /// Whether to start polling as soon as the engine is running.
    ///
    /// When disabled, nothing is fetched until [`EngineController::start_polling`]
    /// or [`EngineController::refresh`] is called.
    pub poll_on_start: bool,

    /// When a held stable URL may be replaced without reselecting.
    pub adoption: AdoptionPolicy,
}

impl EngineConfig {
    /// Default polling period (matches the web dashboard).
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

    /// Shortest polling period the engine accepts; shorter values are clamped.
    pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(250);
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            poll_on_start: true,
            adoption: AdoptionPolicy::default(),
        }
    }
}

/// Whether a refresh is user-visible.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RefreshMode {
    /// Triggered by the user: failures are surfaced.
    Foreground,
    /// Scheduled poll: failures are only logged.
    Background,
}

impl RefreshMode {
    /// `true` for [`RefreshMode::Foreground`].
    pub fn is_foreground(self) -> bool {
        self == RefreshMode::Foreground
    }

    /// Combine two coalesced requests; foreground wins.
    pub fn union(self, other: RefreshMode) -> RefreshMode {
        if self.is_foreground() || other.is_foreground() {
            RefreshMode::Foreground
        } else {
            RefreshMode::Background
        }
    }
}

/// Engine event stream payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// Engine started.
    Started,
    /// A merged snapshot changed the job list.
    JobsUpdated {
        /// Number of jobs after the merge.
        count: usize,
    },
    /// The user selection changed.
    SelectionChanged {
        /// New selection, if any.
        selected: Option<JobId>,
    },
    /// The URL bound to the active viewer changed.
    StableUrlChanged {
        /// New stable URL, if any.
        url: Option<String>,
    },
    /// A foreground refresh failed.
    Error {
        /// Human-readable status line.
        message: String,
    },
    /// A foreground refresh succeeded after an earlier one had failed.
    ErrorCleared,
    /// Engine stopped.
    Stopped,
}

/// Current engine state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Merged jobs in backend order.
    pub jobs: Vec<JobRecord>,
    /// Currently selected job.
    pub selected: Option<JobId>,
    /// URL bound to the active viewer for the selected job.
    pub stable_url: Option<String>,
    /// Whether periodic polling is active.
    pub polling: bool,
    /// Whether a foreground refresh is outstanding or queued.
    pub foreground_pending: bool,
    /// Last foreground failure, cleared by the next successful foreground refresh.
    pub last_error: Option<String>,
    /// Number of fetches whose result was merged.
    pub fetches_completed: u64,
    /// When the last merge happened.
    pub last_updated: Option<DateTime<Utc>>,
}

impl StatusSnapshot {
    /// Look up a job by id.
    pub fn job(&self, id: &JobId) -> Option<&JobRecord> {
        self.jobs.iter().find(|job| &job.id == id)
    }

    /// Progress of a job, if it is known.
    pub fn progress(&self, id: &JobId) -> Option<Progress> {
        self.job(id).map(|job| progress_of(&job.status))
    }
}

/// Cloneable control surface of a running engine.
#[derive(Clone)]
pub struct EngineController {
    pub(crate) inner: Arc<EngineInner>,
}

impl EngineController {
    fn send(&self, cmd: EngineCommand) {
        // The runtime is gone after shutdown; commands are dropped.
        let _ = self.inner.cmd_tx.send(cmd);
    }

    /// Subscribe to the engine event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EngineEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Watch snapshot updates.
    pub fn watch(&self) -> tokio::sync::watch::Receiver<StatusSnapshot> {
        self.inner.snapshot_rx.clone()
    }

    /// Get the latest engine snapshot.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.snapshot_rx.borrow().clone()
    }

    /// Latest merged job list.
    pub fn jobs(&self) -> Vec<JobRecord> {
        self.inner.snapshot_rx.borrow().jobs.clone()
    }

    /// Currently selected job.
    pub fn selected(&self) -> Option<JobId> {
        self.inner.snapshot_rx.borrow().selected.clone()
    }

    /// URL bound to the active viewer.
    pub fn stable_url(&self) -> Option<String> {
        self.inner.snapshot_rx.borrow().stable_url.clone()
    }

    /// Progress of a known job.
    pub fn progress(&self, id: &JobId) -> Option<Progress> {
        self.inner.snapshot_rx.borrow().progress(id)
    }

    /// Select a job (or clear the selection with `None`).
    pub fn select(&self, id: Option<JobId>) {
        self.send(EngineCommand::Select(id));
    }

    /// Start (or restart) periodic polling.
    pub fn start_polling(&self, interval: Duration) {
        self.send(EngineCommand::StartPolling(interval));
    }

    /// Stop periodic polling and discard any outstanding fetch.
    pub fn stop_polling(&self) {
        self.send(EngineCommand::StopPolling);
    }

    /// Request a refresh.
    pub fn refresh(&self, mode: RefreshMode) {
        self.send(EngineCommand::Refresh(mode));
    }

    /// Ask the backend to (re)generate the summary, then refresh.
    pub async fn generate_summary(&self, id: &JobId) -> Result<(), SyncError> {
        self.inner.backend.generate_summary(id).await?;
        self.refresh(RefreshMode::Foreground);
        Ok(())
    }

    /// Store a manual transcript for a job, then refresh.
    pub async fn save_transcript(&self, id: &JobId, transcript: &str) -> Result<(), SyncError> {
        if transcript.trim().is_empty() {
            return Err(SyncError::EmptyTranscript);
        }
        self.inner.backend.save_transcript(id, transcript).await?;
        self.refresh(RefreshMode::Foreground);
        Ok(())
    }

    /// Delete a job, clearing the selection if it pointed at it, then refresh.
    pub async fn delete_job(&self, id: &JobId) -> Result<(), SyncError> {
        self.inner.backend.delete_job(id).await?;
        self.send(EngineCommand::Forget(id.clone()));
        self.refresh(RefreshMode::Foreground);
        Ok(())
    }

    /// Save a job's summary as a note. The job list is unaffected.
    pub async fn save_as_note(&self, id: &JobId) -> Result<SavedNote, SyncError> {
        self.inner.backend.save_as_note(id).await
    }

    /// Stop the engine task.
    pub fn shutdown(&self) {
        self.send(EngineCommand::Shutdown);
    }
}

/// Handle to a running in-process engine instance.
pub struct EngineHandle {
    pub(crate) controller: EngineController,
    pub(crate) join: tokio::task::JoinHandle<anyhow::Result<()>>,
}

/// Start a new in-process engine instance.
pub fn start_engine(config: EngineConfig, backend: Arc<dyn JobBackend>) -> EngineHandle {
    crate::engine::start_engine(config, backend)
}

impl EngineHandle {
    /// A cloneable controller for this engine.
    pub fn controller(&self) -> EngineController {
        self.controller.clone()
    }

    /// Subscribe to the engine event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EngineEvent> {
        self.controller.subscribe()
    }

    /// Get the latest engine snapshot.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.controller.snapshot()
    }

    /// Request the engine task to stop.
    pub fn shutdown(&self) {
        self.controller.shutdown();
    }

    /// Wait for the engine to stop, returning the engine task result.
    pub async fn wait(self) -> anyhow::Result<()> {
        match self.join.await {
            Ok(res) => res,
            Err(err) => Err(anyhow::anyhow!("engine task join error: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreground_wins_when_coalescing() {
        use RefreshMode::*;
        assert_eq!(Background.union(Background), Background);
        assert_eq!(Background.union(Foreground), Foreground);
        assert_eq!(Foreground.union(Background), Foreground);
    }
}
