//! In-memory Report Reconciliation Store.
//!
//! The store is the only owner of the displayed list. Consumers read
//! snapshots or subscribe for change notifications; every mutation goes
//! through `add_report`, `update_report` or `reconcile`.

use tokio::sync::watch;

use crate::reconcile;
use crate::schema::{Report, ReportPatch, ReportStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub uploaded: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.uploaded + self.failed
    }
}

#[derive(Debug)]
pub struct ReportStore {
    tx: watch::Sender<Vec<Report>>,
}

impl Default for ReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self { tx }
    }

    /// Receiver that observes every applied mutation.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Report>> {
        self.tx.subscribe()
    }

    /// Snapshot of the current list, newest first.
    pub fn reports(&self) -> Vec<Report> {
        self.tx.borrow().clone()
    }

    pub fn get(&self, id: &str) -> Option<Report> {
        self.tx.borrow().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for report in self.tx.borrow().iter() {
            match report.status {
                ReportStatus::Pending => counts.pending += 1,
                ReportStatus::Uploaded => counts.uploaded += 1,
                ReportStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Inserts `report` at the front. Returns false if its id is already
    /// present; the list is left untouched in that case.
    pub fn add_report(&self, report: Report) -> bool {
        let id = report.id.clone();
        let added = self.tx.send_if_modified(move |reports| {
            if reports.iter().any(|r| r.id == report.id) {
                return false;
            }
            reports.insert(0, report);
            true
        });

        if added {
            tracing::debug!(%id, "Report added");
        } else {
            tracing::warn!(%id, "Report id already present, add ignored");
        }
        added
    }

    /// Applies `patch` to the report with `id`. Unknown ids, same-state
    /// patches and disallowed status transitions are no-ops. Returns whether
    /// anything changed.
    pub fn update_report(&self, id: &str, patch: ReportPatch) -> bool {
        self.tx.send_if_modified(|reports| {
            let Some(report) = reports.iter_mut().find(|r| r.id == id) else {
                tracing::debug!(%id, "Update for unknown report ignored");
                return false;
            };
            apply_patch(report, patch)
        })
    }

    /// Replaces the list with the merge of its current local-only entries
    /// and the fetched `remote` batch. The local side is read at call time,
    /// so reports added while the fetch was in flight are kept.
    pub fn reconcile(&self, remote: Vec<Report>) {
        let remote_len = remote.len();
        self.tx.send_modify(|reports| {
            let merged = reconcile::reconcile(reports, remote);
            tracing::info!(
                before = reports.len(),
                remote = remote_len,
                after = merged.len(),
                "Reconciled report list",
            );
            *reports = merged;
        });
    }
}

fn apply_patch(report: &mut Report, patch: ReportPatch) -> bool {
    if let Some(next) = patch.status {
        if next != report.status && !report.status.can_advance_to(next) {
            tracing::warn!(
                id = %report.id,
                from = %report.status,
                to = %next,
                "Refused status transition",
            );
            return false;
        }
        let media_after = patch
            .remote_media_ref
            .as_ref()
            .or(report.remote_media_ref.as_ref());
        if next == ReportStatus::Uploaded && media_after.is_none() {
            tracing::warn!(id = %report.id, "Refused upload without a remote media ref");
            return false;
        }
    }

    let mut changed = false;
    if let Some(status) = patch.status {
        changed |= replace(&mut report.status, status);
    }
    if let Some(media) = patch.remote_media_ref {
        changed |= replace(&mut report.remote_media_ref, Some(media));
    }
    if let Some(description) = patch.description {
        changed |= replace(&mut report.description, description);
    }
    if let Some(address) = patch.address {
        changed |= replace(&mut report.address, Some(address));
    }

    if changed {
        tracing::debug!(id = %report.id, status = %report.status, "Report updated");
    }
    changed
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
