//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Notify;

use rescue_core::collab::{Camera, ImageRef, Locator, MediaRef, ObjectStorage, RelationalStore};
use rescue_core::error::{CaptureError, GeocodeError, InsertError, PositionUnavailable, QueryError, UploadError};
use rescue_core::geocode::Placemark;
use rescue_core::schema::{Coords, NewReportRow, RemoteRow};
use rescue_core::{Report, ReportStore};

pub struct FakeCamera {
    pub fail_capture: bool,
    pub fail_load: bool,
}

impl FakeCamera {
    pub fn working() -> Self {
        Self { fail_capture: false, fail_load: false }
    }
}

impl Camera for FakeCamera {
    async fn capture(&self) -> Result<ImageRef, CaptureError> {
        if self.fail_capture {
            return Err(CaptureError::NoFrame("lens covered".into()));
        }
        Ok(ImageRef("file:///cache/photo-1.jpg".into()))
    }

    async fn load(&self, image: &ImageRef) -> Result<Vec<u8>, CaptureError> {
        if self.fail_load {
            return Err(CaptureError::Unreadable {
                image_ref: image.0.clone(),
                reason: "evicted from cache".into(),
            });
        }
        Ok(vec![0xFF, 0xD8, 0xFF, 0xE0])
    }
}

pub struct FakeLocator {
    pub position: Option<Coords>,
    pub placemarks: Result<Vec<Placemark>, String>,
}

impl FakeLocator {
    pub fn at(lat: f64, lng: f64, city: &str) -> Self {
        Self {
            position: Coords::new(lat, lng),
            placemarks: Ok(vec![Placemark {
                street: Some("Main St".into()),
                city: Some(city.into()),
                ..Placemark::default()
            }]),
        }
    }

    pub fn denied() -> Self {
        Self { position: None, placemarks: Ok(Vec::new()) }
    }
}

impl Locator for FakeLocator {
    async fn position(&self) -> Result<Coords, PositionUnavailable> {
        self.position.ok_or(PositionUnavailable::PermissionDenied)
    }

    async fn reverse_geocode(&self, _coords: Coords) -> Result<Vec<Placemark>, GeocodeError> {
        self.placemarks.clone().map_err(GeocodeError)
    }
}

/// Storage fake. Records what the store looked like when the upload began.
pub struct FakeStorage<'a> {
    pub store: Option<&'a ReportStore>,
    pub fail: bool,
    pub hang: bool,
    pub seen_at_upload: Mutex<Option<Vec<Report>>>,
    pub uploads: AtomicUsize,
}

impl<'a> FakeStorage<'a> {
    pub fn new() -> Self {
        Self {
            store: None,
            fail: false,
            hang: false,
            seen_at_upload: Mutex::new(None),
            uploads: AtomicUsize::new(0),
        }
    }

    pub fn observing(store: &'a ReportStore) -> Self {
        Self { store: Some(store), ..Self::new() }
    }
}

impl ObjectStorage for FakeStorage<'_> {
    async fn upload(&self, path: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<MediaRef, UploadError> {
        if let Some(store) = self.store {
            *self.seen_at_upload.lock().unwrap() = Some(store.reports());
        }
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.fail {
            return Err(UploadError::Storage("bucket unavailable".into()));
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(MediaRef(path.to_string()))
    }

    fn public_url(&self, media: &MediaRef) -> String {
        format!("https://cdn.test/reports/{}", media.0)
    }
}

/// Relational fake backed by a vector, newest row first.
#[derive(Default)]
pub struct MemoryRows {
    pub rows: Mutex<Vec<RemoteRow>>,
    pub next_id: AtomicUsize,
    /// Write the row, then report failure (lost acknowledgement).
    pub fail_after_write: bool,
    pub fail_insert: bool,
    pub fail_query: AtomicBool,
    pub hang_query: bool,
    /// When set, queries wait for a permit before answering.
    pub gate: Option<Notify>,
}

impl MemoryRows {
    pub fn with_rows(rows: Vec<RemoteRow>) -> Self {
        let next_id = AtomicUsize::new(rows.len() + 1);
        Self { rows: Mutex::new(rows), next_id, ..Self::default() }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn push_row(&self, row: RemoteRow) {
        self.rows.lock().unwrap().insert(0, row);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

pub fn row(id: &str, photo_url: &str) -> RemoteRow {
    RemoteRow {
        id: id.to_string(),
        created_at: Some("2025-04-01T12:00:00Z".into()),
        photo_url: Some(photo_url.to_string()),
        description: Some("limping dog".into()),
        ..RemoteRow::default()
    }
}

impl RelationalStore for MemoryRows {
    async fn insert(&self, new_row: NewReportRow) -> Result<RemoteRow, InsertError> {
        if self.fail_insert {
            return Err(InsertError::Rejected("row level security".into()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = RemoteRow {
            id: format!("{}", 1000 + id),
            submission_id: Some(new_row.submission_id),
            created_at: Some(
                new_row
                    .created_at
                    .format(&time::format_description::well_known::Rfc3339)
                    .unwrap(),
            ),
            photo_url: Some(new_row.photo_url),
            description: Some(new_row.description),
            address: new_row.address,
            lat: new_row.lat,
            lng: new_row.lng,
        };
        self.push_row(stored.clone());
        if self.fail_after_write {
            return Err(InsertError::Rejected("connection reset".into()));
        }
        Ok(stored)
    }

    async fn query(&self, limit: usize) -> Result<Vec<RemoteRow>, QueryError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.hang_query {
            std::future::pending::<()>().await;
        }
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(QueryError::Other("network unreachable".into()));
        }
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().take(limit).cloned().collect())
    }
}
