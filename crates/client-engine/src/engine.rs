use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use vidnotes_client_core::{ClientState, JobId, JobRecord};

use crate::api::{
    EngineConfig, EngineController, EngineEvent, EngineHandle, RefreshMode, StatusSnapshot,
};
use crate::backend::{JobBackend, SyncError};

pub(crate) struct EngineInner {
    pub(crate) event_tx: broadcast::Sender<EngineEvent>,
    pub(crate) snapshot_rx: watch::Receiver<StatusSnapshot>,
    pub(crate) cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    pub(crate) backend: Arc<dyn JobBackend>,
}

#[derive(Debug)]
pub(crate) enum EngineCommand {
    Select(Option<JobId>),
    /// Clear the selection if it points at a job that was just deleted.
    Forget(JobId),
    StartPolling(Duration),
    StopPolling,
    Refresh(RefreshMode),
    Shutdown,
}

type FetchResult = Result<Vec<JobRecord>, SyncError>;
type FetchJoin = Result<FetchResult, tokio::task::JoinError>;

struct InflightFetch {
    mode: RefreshMode,
    task: JoinHandle<FetchResult>,
}

struct EngineRuntime {
    backend: Arc<dyn JobBackend>,
    state: ClientState,
    cmd_rx: mpsc::UnboundedReceiver<EngineCommand>,
    ticker: Option<Interval>,
    inflight: Option<InflightFetch>,
    /// Refresh requested while `inflight` was outstanding.
    queued: Option<RefreshMode>,
    last_error: Option<String>,
    fetches_completed: u64,
    last_updated: Option<chrono::DateTime<Utc>>,
    snapshot_tx: watch::Sender<StatusSnapshot>,
    event_tx: broadcast::Sender<EngineEvent>,
}

fn describe_fetch_failure(err: &SyncError) -> String {
    match err {
        SyncError::Status { status, body } => {
            format!("Error loading jobs ({}): {body}", status.as_u16())
        }
        other => format!("Error loading jobs: {other}"),
    }
}

impl EngineRuntime {
    fn build_snapshot(&self) -> StatusSnapshot {
        let foreground_pending = self
            .inflight
            .as_ref()
            .is_some_and(|f| f.mode.is_foreground())
            || self.queued.is_some_and(RefreshMode::is_foreground);

        StatusSnapshot {
            jobs: self.state.jobs().to_vec(),
            selected: self.state.selected().cloned(),
            stable_url: self.state.stable_url().map(str::to_string),
            polling: self.ticker.is_some(),
            foreground_pending,
            last_error: self.last_error.clone(),
            fetches_completed: self.fetches_completed,
            last_updated: self.last_updated,
        }
    }

    fn push_snapshot(&self) {
        let snap = self.build_snapshot();
        let _ = self.snapshot_tx.send(snap);
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }

    fn request_refresh(&mut self, mode: RefreshMode) {
        if self.inflight.is_some() {
            let coalesced = self.queued.map_or(mode, |queued| queued.union(mode));
            debug!(?coalesced, "fetch outstanding; coalescing refresh");
            self.queued = Some(coalesced);
            return;
        }
        self.start_fetch(mode);
    }

    fn start_fetch(&mut self, mode: RefreshMode) {
        let backend = self.backend.clone();
        debug!(?mode, "fetching jobs");
        self.inflight = Some(InflightFetch {
            mode,
            task: tokio::spawn(async move { backend.fetch_jobs().await }),
        });
    }

    fn discard_inflight(&mut self) {
        if let Some(fetch) = self.inflight.take() {
            debug!(mode = ?fetch.mode, "discarding outstanding fetch");
            fetch.task.abort();
        }
        self.queued = None;
    }

    fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Select(id) => self.apply_selection(id),
            EngineCommand::Forget(id) => {
                if self.state.selected() == Some(&id) {
                    self.apply_selection(None);
                }
            }
            EngineCommand::StartPolling(interval) => {
                let period = interval.max(EngineConfig::MIN_POLL_INTERVAL);
                info!(period_ms = period.as_millis() as u64, "polling started");
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.ticker = Some(ticker);
                self.request_refresh(RefreshMode::Foreground);
            }
            EngineCommand::StopPolling => {
                if self.ticker.take().is_some() {
                    info!("polling stopped");
                }
                self.discard_inflight();
            }
            EngineCommand::Refresh(mode) => self.request_refresh(mode),
            // Handled by the run loop.
            EngineCommand::Shutdown => {}
        }
        self.push_snapshot();
    }

    fn apply_selection(&mut self, id: Option<JobId>) {
        let transition = self.state.select(id);
        if !transition.selection_changed {
            return;
        }
        let selected = self.state.selected().cloned();
        self.emit(EngineEvent::SelectionChanged {
            selected: selected.clone(),
        });
        if transition.stable_url_changed {
            self.emit(EngineEvent::StableUrlChanged { url: None });
        }
        // The new selection adopts its URL from the next snapshot.
        if selected.is_some() {
            self.request_refresh(RefreshMode::Background);
        }
    }

    fn handle_fetch_result(&mut self, res: FetchJoin) {
        let Some(fetch) = self.inflight.take() else {
            return;
        };
        let foreground = fetch.mode.is_foreground();

        let outcome = match res {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("jobs fetch task join error: {err:#}");
                if foreground {
                    let message = format!("Error loading jobs: {err}");
                    self.last_error = Some(message.clone());
                    self.emit(EngineEvent::Error { message });
                }
                self.after_fetch();
                return;
            }
        };

        match outcome {
            Ok(jobs) => {
                let transition = self.state.apply_snapshot(jobs);
                self.fetches_completed += 1;
                self.last_updated = Some(Utc::now());
                let recovered = foreground && self.last_error.take().is_some();
                debug!(
                    jobs = self.state.jobs().len(),
                    changed = transition.jobs_changed,
                    "merged jobs snapshot"
                );
                if transition.jobs_changed {
                    self.emit(EngineEvent::JobsUpdated {
                        count: self.state.jobs().len(),
                    });
                }
                if transition.stable_url_changed {
                    self.emit(EngineEvent::StableUrlChanged {
                        url: self.state.stable_url().map(str::to_string),
                    });
                }
                if recovered {
                    self.emit(EngineEvent::ErrorCleared);
                }
            }
            Err(err) if foreground => {
                let message = describe_fetch_failure(&err);
                warn!(kind = ?err.kind(), "{message}");
                self.last_error = Some(message.clone());
                self.emit(EngineEvent::Error { message });
            }
            Err(err) => {
                warn!(kind = ?err.kind(), "background jobs poll failed: {err}");
            }
        }
        self.after_fetch();
    }

    fn after_fetch(&mut self) {
        if let Some(mode) = self.queued.take() {
            self.start_fetch(mode);
        }
        self.push_snapshot();
    }

    async fn run(mut self) -> anyhow::Result<()> {
        self.emit(EngineEvent::Started);
        self.push_snapshot();

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        None | Some(EngineCommand::Shutdown) => break,
                        Some(cmd) => self.handle_command(cmd),
                    }
                }
                _ = async {
                    match self.ticker.as_mut() {
                        Some(ticker) => {
                            ticker.tick().await;
                        }
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    self.request_refresh(RefreshMode::Background);
                    self.push_snapshot();
                }
                res = async {
                    match self.inflight.as_mut() {
                        Some(fetch) => (&mut fetch.task).await,
                        None => std::future::pending::<FetchJoin>().await,
                    }
                } => {
                    self.handle_fetch_result(res);
                }
            }
        }

        self.ticker = None;
        self.discard_inflight();
        self.emit(EngineEvent::Stopped);
        self.push_snapshot();
        Ok(())
    }
}

pub(crate) fn start_engine(cfg: EngineConfig, backend: Arc<dyn JobBackend>) -> EngineHandle {
    let (event_tx, _) = broadcast::channel::<EngineEvent>(1024);
    let (snapshot_tx, snapshot_rx) = watch::channel(StatusSnapshot::default());
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<EngineCommand>();

    let inner = Arc::new(EngineInner {
        event_tx: event_tx.clone(),
        snapshot_rx,
        cmd_tx,
        backend: backend.clone(),
    });

    if cfg.poll_on_start {
        let _ = inner
            .cmd_tx
            .send(EngineCommand::StartPolling(cfg.poll_interval));
    }

    let runtime = EngineRuntime {
        backend,
        state: ClientState::new(cfg.adoption),
        cmd_rx,
        ticker: None,
        inflight: None,
        queued: None,
        last_error: None,
        fetches_completed: 0,
        last_updated: None,
        snapshot_tx,
        event_tx,
    };

    let join = tokio::spawn(runtime.run());
    EngineHandle {
        controller: EngineController { inner },
        join,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_messages_match_dashboard_wording() {
        let err = SyncError::Status {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: "{\"error\":\"No auth token\"}".to_string(),
        };
        assert_eq!(
            describe_fetch_failure(&err),
            "Error loading jobs (401): {\"error\":\"No auth token\"}"
        );

        let parse = serde_json::from_str::<Vec<JobRecord>>("[1]").unwrap_err();
        assert!(
            describe_fetch_failure(&SyncError::Parse(parse))
                .starts_with("Error loading jobs: malformed jobs payload")
        );
    }
}
