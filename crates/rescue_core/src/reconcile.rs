//! Merge of locally held, unconfirmed reports with an authoritative fetch.
//!
//! The merge is a pure function of the current list and the fetched batch so
//! it can be tested without any store, network or timing involved.

use std::collections::HashSet;

use uuid::Uuid;

use crate::schema::{Report, ReportStatus};

/// Identity a report can be matched on during de-duplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Submission(Uuid),
    Media(String),
    Id(String),
}

/// All keys a report answers to, strongest first.
pub fn dedup_keys(report: &Report) -> Vec<DedupKey> {
    let mut keys = Vec::with_capacity(3);
    if let Some(submission_id) = report.submission_id {
        keys.push(DedupKey::Submission(submission_id));
    }
    if let Some(media) = report.remote_media_ref.as_deref().filter(|m| !m.is_empty()) {
        keys.push(DedupKey::Media(media.to_string()));
    }
    keys.push(DedupKey::Id(report.id.clone()));
    keys
}

#[derive(Debug, Default)]
struct SeenKeys(HashSet<DedupKey>);

impl SeenKeys {
    fn contains_any(&self, keys: &[DedupKey]) -> bool {
        keys.iter().any(|key| self.0.contains(key))
    }

    fn insert_all(&mut self, keys: Vec<DedupKey>) {
        self.0.extend(keys);
    }
}

/// Builds the list to display after a fetch.
///
/// Uploaded entries in `current` are dropped; the fetch is authoritative for
/// them. Pending entries are kept and shadow any remote row sharing a key.
/// Failed entries are kept unless the fetch now contains a matching row, in
/// which case the server copy replaces them. Local entries keep their order
/// and come first, followed by the remaining remote rows in server order.
pub fn reconcile(current: &[Report], remote: Vec<Report>) -> Vec<Report> {
    let mut remote_keys = SeenKeys::default();
    for report in &remote {
        remote_keys.insert_all(dedup_keys(report));
    }

    let mut seen = SeenKeys::default();
    // Keys of failed entries replaced by a server row, claimed by the first
    // row that matches them.
    let mut superseded: Vec<Vec<DedupKey>> = Vec::new();
    let mut merged = Vec::with_capacity(current.len() + remote.len());

    for report in current {
        if !report.status.is_local_only() {
            continue;
        }
        let keys = dedup_keys(report);
        if report.status == ReportStatus::Failed && remote_keys.contains_any(&keys) {
            tracing::debug!(id = %report.id, "Failed report confirmed by server, dropping local copy");
            superseded.push(keys);
            continue;
        }
        let duplicate = seen.contains_any(&keys);
        seen.insert_all(keys);
        if !duplicate {
            merged.push(report.clone());
        }
    }

    for report in remote {
        let keys = dedup_keys(&report);
        let duplicate = seen.contains_any(&keys);
        if !duplicate {
            superseded.retain(|failed| {
                let claimed = failed.iter().any(|key| keys.contains(key));
                if claimed {
                    seen.insert_all(failed.clone());
                }
                !claimed
            });
        }
        seen.insert_all(keys);
        if !duplicate {
            merged.push(report);
        }
    }

    merged
}
