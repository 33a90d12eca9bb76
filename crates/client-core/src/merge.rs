//! Reconciliation of a fresh backend snapshot with the previously held one.

use std::collections::HashMap;

use crate::job::{JobId, JobRecord};

/// Merge `incoming` over `previous`.
///
/// The result has exactly the ids and order of `incoming`. A record keeps its
/// previous access URL when the id matches, the `resource_ref` is unchanged
/// and the previous URL is non-empty; every other field comes from `incoming`.
/// Ids missing from `incoming` are dropped.
pub fn merge_snapshots(previous: &[JobRecord], incoming: Vec<JobRecord>) -> Vec<JobRecord> {
    let previous_by_id: HashMap<&JobId, &JobRecord> =
        previous.iter().map(|job| (&job.id, job)).collect();

    incoming
        .into_iter()
        .map(|mut job| {
            if let Some(prev) = previous_by_id.get(&job.id) {
                if prev.resource_ref == job.resource_ref {
                    if let Some(url) = prev.access_url() {
                        job.ephemeral_access_url = Some(url.to_string());
                    }
                }
            }
            job
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::job::JobStatus;
    use crate::job::fixtures::job;

    #[test]
    fn keeps_previous_url_for_same_resource() {
        let previous = vec![job("A", "r1", Some("u1"), "transcribing")];
        let mut fresh = job("A", "r1", Some("u2"), "ready");
        fresh.summary = Some("notes".to_string());

        let merged = merge_snapshots(&previous, vec![fresh]);
        assert_eq!(merged[0].ephemeral_access_url.as_deref(), Some("u1"));
        assert_eq!(merged[0].status, JobStatus::Ready);
        assert_eq!(merged[0].summary.as_deref(), Some("notes"));
    }

    #[test]
    fn adopts_incoming_url_when_resource_changes() {
        let previous = vec![job("A", "r1", Some("u1"), "ready")];
        let merged = merge_snapshots(&previous, vec![job("A", "r2", Some("u10"), "queued")]);
        assert_eq!(merged[0].ephemeral_access_url.as_deref(), Some("u10"));
        assert_eq!(merged[0].resource_ref.as_deref(), Some("r2"));
    }

    #[test]
    fn empty_previous_url_is_not_preserved() {
        let previous = vec![job("A", "r1", Some(""), "queued")];
        let merged = merge_snapshots(&previous, vec![job("A", "r1", Some("u1"), "queued")]);
        assert_eq!(merged[0].ephemeral_access_url.as_deref(), Some("u1"));

        let previous = vec![job("A", "r1", None, "queued")];
        let merged = merge_snapshots(&previous, vec![job("A", "r1", None, "queued")]);
        assert_eq!(merged[0].ephemeral_access_url, None);
    }

    #[test]
    fn incoming_without_url_inherits_held_url() {
        let previous = vec![job("A", "r1", Some("u1"), "ready")];
        let merged = merge_snapshots(&previous, vec![job("A", "r1", None, "ready")]);
        assert_eq!(merged[0].ephemeral_access_url.as_deref(), Some("u1"));
    }

    #[test]
    fn follows_incoming_order_and_drops_deleted() {
        let previous = vec![
            job("A", "ra", Some("ua"), "ready"),
            job("B", "rb", Some("ub"), "ready"),
            job("C", "rc", Some("uc"), "ready"),
        ];
        let incoming = vec![
            job("D", "rd", Some("ud"), "queued"),
            job("C", "rc", Some("uc2"), "ready"),
            job("A", "ra", Some("ua2"), "ready"),
        ];
        let merged = merge_snapshots(&previous, incoming);
        let ids: Vec<&str> = merged.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["D", "C", "A"]);
        let urls: Vec<Option<&str>> = merged.iter().map(|j| j.access_url()).collect();
        assert_eq!(urls, vec![Some("ud"), Some("uc"), Some("ua")]);
    }

    #[test]
    fn merging_the_same_snapshot_twice_is_stable() {
        let previous = vec![
            job("A", "r1", Some("u1"), "ready"),
            job("B", "r1", Some("u1"), "ready"),
        ];
        let incoming = vec![
            job("A", "r1", Some("u2"), "ready"),
            job("B", "r2", Some("u3"), "queued"),
            job("C", "r3", None, "queued"),
        ];
        let once = merge_snapshots(&previous, incoming.clone());
        let twice = merge_snapshots(&once, incoming);
        assert_eq!(twice, once);
    }
}
