//! Fetch flow behind the community feed.
//!
//! A `FeedController` pulls the newest rows from the relational store and
//! hands them to the store's merge. Results that arrive after the feed was
//! unmounted are dropped, and a failed fetch leaves the list as it was.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use time::OffsetDateTime;

use crate::collab::RelationalStore;
use crate::config::Config;
use crate::schema::{RemoteRow, Report};
use crate::store::ReportStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Rows were merged into the store.
    Applied { count: usize },
    /// The query failed or timed out; the list is unchanged.
    Failed,
    /// The feed went away while the query was in flight.
    Discarded,
    /// Another refresh for the same mount was already running.
    Skipped,
}

pub struct FeedController<'a, R> {
    store: &'a ReportStore,
    relational: &'a R,
    limit: usize,
    timeout: Duration,
    /// Mount generation of the fetch in flight, if any.
    inflight: Mutex<Option<u64>>,
    mounted: AtomicBool,
    generation: AtomicU64,
}

/// Releases the in-flight slot on every exit path, unless a newer mount
/// has taken it over.
struct RefreshGuard<'a> {
    slot: &'a Mutex<Option<u64>>,
    generation: u64,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let mut inflight = lock(self.slot);
        if *inflight == Some(self.generation) {
            *inflight = None;
        }
    }
}

fn lock(slot: &Mutex<Option<u64>>) -> std::sync::MutexGuard<'_, Option<u64>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<'a, R: RelationalStore> FeedController<'a, R> {
    pub fn new(store: &'a ReportStore, relational: &'a R, config: &Config) -> Self {
        Self {
            store,
            relational,
            limit: config.fetch_limit,
            timeout: config.request_timeout(),
            inflight: Mutex::new(None),
            mounted: AtomicBool::new(true),
            generation: AtomicU64::new(0),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        lock(&self.inflight).is_some()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Feed screen gained focus: mount and reload.
    pub async fn on_focus(&self) -> RefreshOutcome {
        self.mounted.store(true, Ordering::SeqCst);
        self.refresh().await
    }

    pub async fn pull_to_refresh(&self) -> RefreshOutcome {
        self.refresh().await
    }

    /// Feed screen lost focus or was torn down. Any fetch in flight is
    /// discarded when it completes.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        if !self.is_mounted() {
            return RefreshOutcome::Discarded;
        }
        let started = self.generation.load(Ordering::SeqCst);
        {
            let mut inflight = lock(&self.inflight);
            match *inflight {
                Some(owner) if owner == started => {
                    tracing::debug!("Refresh already in flight");
                    return RefreshOutcome::Skipped;
                }
                Some(owner) if owner > started => return RefreshOutcome::Discarded,
                Some(owner) => {
                    tracing::debug!(stale = owner, current = started, "Refetching over a fetch from an earlier mount");
                }
                None => {}
            }
            *inflight = Some(started);
        }
        let _guard = RefreshGuard {
            slot: &self.inflight,
            generation: started,
        };

        let rows = match tokio::time::timeout(self.timeout, self.relational.query(self.limit)).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Feed fetch failed, keeping current list");
                return RefreshOutcome::Failed;
            }
            Err(_) => {
                tracing::warn!(after = ?self.timeout, "Feed fetch timed out, keeping current list");
                return RefreshOutcome::Failed;
            }
        };

        if !self.is_mounted() || self.generation.load(Ordering::SeqCst) != started {
            tracing::debug!(rows = rows.len(), "Feed no longer shown, discarding fetch result");
            return RefreshOutcome::Discarded;
        }

        let remote = normalize_rows(rows, OffsetDateTime::now_utc());
        let count = remote.len();
        self.store.reconcile(remote);
        RefreshOutcome::Applied { count }
    }
}

/// Converts raw rows into confirmed reports, keeping partially written rows.
pub fn normalize_rows(rows: Vec<RemoteRow>, now: OffsetDateTime) -> Vec<Report> {
    rows.into_iter()
        .map(|row| {
            let report = row.into_report(now);
            if report.remote_media_ref.is_none() {
                tracing::warn!(id = %report.id, "Remote row has no photo URL");
            }
            report
        })
        .collect()
}
