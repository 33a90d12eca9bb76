use crate::job::{JobId, JobRecord};
use crate::merge::merge_snapshots;
use crate::progress::{Progress, progress_of};
use crate::selection::{AdoptionPolicy, SelectionStabilizer};

/// What a single transition changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transition {
    pub jobs_changed: bool,
    pub selection_changed: bool,
    pub stable_url_changed: bool,
}

/// Session-local view of the backend jobs plus the user's selection.
///
/// Jobs are only ever replaced through [`ClientState::apply_snapshot`], never
/// overwritten wholesale.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    jobs: Vec<JobRecord>,
    selection: SelectionStabilizer,
}

impl ClientState {
    pub fn new(policy: AdoptionPolicy) -> Self {
        Self {
            jobs: Vec::new(),
            selection: SelectionStabilizer::new(policy),
        }
    }

    pub fn jobs(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn job(&self, id: &JobId) -> Option<&JobRecord> {
        self.jobs.iter().find(|job| &job.id == id)
    }

    pub fn selected(&self) -> Option<&JobId> {
        self.selection.selected()
    }

    pub fn stable_url(&self) -> Option<&str> {
        self.selection.stable_url()
    }

    pub fn progress(&self, id: &JobId) -> Option<Progress> {
        self.job(id).map(|job| progress_of(&job.status))
    }

    pub fn apply_snapshot(&mut self, incoming: Vec<JobRecord>) -> Transition {
        let merged = merge_snapshots(&self.jobs, incoming);
        let jobs_changed = merged != self.jobs;
        self.jobs = merged;
        let stable_url_changed = self.selection.on_state_update(&self.jobs);
        Transition {
            jobs_changed,
            selection_changed: false,
            stable_url_changed,
        }
    }

    /// Select a job (or clear the selection). The stable URL is released and
    /// only re-adopted by the next snapshot.
    pub fn select(&mut self, id: Option<JobId>) -> Transition {
        let had_url = self.selection.stable_url().is_some();
        let selection_changed = self.selection.select(id);
        Transition {
            jobs_changed: false,
            selection_changed,
            stable_url_changed: selection_changed && had_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::fixtures::job;

    #[test]
    fn reupload_walkthrough_with_hold_policy() {
        let mut state = ClientState::new(AdoptionPolicy::HoldUntilReselect);
        assert_eq!(state.stable_url(), None);

        state.apply_snapshot(vec![job("A", "r1", Some("u1"), "ready")]);
        state.select(Some(JobId::from("A")));
        assert_eq!(state.stable_url(), None);
        // Adoption happens on the next snapshot, not on select.
        state.apply_snapshot(vec![job("A", "r1", Some("u1"), "ready")]);
        assert_eq!(state.stable_url(), Some("u1"));

        let t = state.apply_snapshot(vec![job("A", "r1", Some("u9"), "ready")]);
        assert!(!t.stable_url_changed);
        assert_eq!(state.stable_url(), Some("u1"));
        assert_eq!(state.jobs()[0].access_url(), Some("u1"));

        state.apply_snapshot(vec![job("A", "r2", Some("u10"), "queued")]);
        assert_eq!(state.jobs()[0].access_url(), Some("u10"));
        assert_eq!(state.stable_url(), Some("u1"));
    }

    #[test]
    fn reupload_walkthrough_with_default_policy() {
        let mut state = ClientState::default();
        state.select(Some(JobId::from("A")));
        state.apply_snapshot(vec![job("A", "r1", Some("u1"), "ready")]);
        state.apply_snapshot(vec![job("A", "r1", Some("u9"), "ready")]);
        assert_eq!(state.stable_url(), Some("u1"));

        let t = state.apply_snapshot(vec![job("A", "r2", Some("u10"), "queued")]);
        assert!(t.stable_url_changed);
        assert_eq!(state.stable_url(), Some("u10"));
    }

    #[test]
    fn progress_lookup() {
        let mut state = ClientState::default();
        state.apply_snapshot(vec![
            job("A", "r1", None, "queued"),
            job("B", "r2", None, "failed"),
        ]);
        assert_eq!(state.progress(&JobId::from("A")).map(|p| p.percent), Some(5));
        assert!(state.progress(&JobId::from("B")).is_some_and(|p| p.failed));
        assert_eq!(state.progress(&JobId::from("Z")), None);
    }

    #[test]
    fn identical_snapshot_reports_no_change() {
        let mut state = ClientState::default();
        let t = state.apply_snapshot(vec![job("A", "r1", Some("u1"), "ready")]);
        assert!(t.jobs_changed);
        let t = state.apply_snapshot(vec![job("A", "r1", Some("u2"), "ready")]);
        assert!(!t.jobs_changed);
    }
}
