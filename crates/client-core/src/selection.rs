//! Binding of the selected job to a single access URL for the active viewer.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::job::{JobId, JobRecord};

/// When a held URL may be replaced without the user reselecting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdoptionPolicy {
    /// Re-adopt when the selected job's `resource_ref` changes (re-upload);
    /// hold across URL reissues of the same asset.
    #[default]
    ReadoptOnResourceChange,
    /// Never replace a held URL until the selection changes.
    HoldUntilReselect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    url: String,
    resource_ref: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionStabilizer {
    policy: AdoptionPolicy,
    selected: Option<JobId>,
    bound: Option<Binding>,
}

impl SelectionStabilizer {
    pub fn new(policy: AdoptionPolicy) -> Self {
        Self {
            policy,
            selected: None,
            bound: None,
        }
    }

    pub fn policy(&self) -> AdoptionPolicy {
        self.policy
    }

    pub fn selected(&self) -> Option<&JobId> {
        self.selected.as_ref()
    }

    pub fn stable_url(&self) -> Option<&str> {
        self.bound.as_ref().map(|b| b.url.as_str())
    }

    /// Change the selection. Returns `true` when the selection changed, in
    /// which case the bound URL is released even if the new job already has one.
    pub fn select(&mut self, id: Option<JobId>) -> bool {
        if self.selected == id {
            return false;
        }
        debug!(from = ?self.selected, to = ?id, "selection changed");
        self.selected = id;
        self.bound = None;
        true
    }

    /// Re-evaluate the binding against a freshly merged job list.
    /// Returns `true` when the stable URL changed.
    pub fn on_state_update(&mut self, jobs: &[JobRecord]) -> bool {
        let Some(selected) = &self.selected else {
            return false;
        };
        // A selected job missing from the snapshot keeps whatever is bound.
        let Some(job) = jobs.iter().find(|job| &job.id == selected) else {
            return false;
        };
        let Some(url) = job.access_url() else {
            return false;
        };

        let adopt = match (&self.bound, self.policy) {
            (None, _) => true,
            (Some(_), AdoptionPolicy::HoldUntilReselect) => false,
            (Some(bound), AdoptionPolicy::ReadoptOnResourceChange) => {
                bound.resource_ref != job.resource_ref
            }
        };
        if !adopt {
            return false;
        }

        debug!(job = %job.id, resource = ?job.resource_ref, "adopting access url");
        self.bound = Some(Binding {
            url: url.to_string(),
            resource_ref: job.resource_ref.clone(),
        });
        true
    }
}
