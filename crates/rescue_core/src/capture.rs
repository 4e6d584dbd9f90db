//! Capture and submission pipeline.
//!
//! Capture: photo, then position, then best-effort reverse geocode.
//! Submission: optimistic `add_report`, then upload, public URL, row insert,
//! and finally a status patch on the local entry. Any failure after the
//! optimistic add marks the entry `failed` instead of dropping it.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::collab::{Camera, ImageRef, Locator, ObjectStorage, RelationalStore};
use crate::config::Config;
use crate::error::{CaptureError, SubmitError, SubmitStage};
use crate::geocode;
use crate::schema::{Coords, NewReportRow, Report, ReportPatch, ReportStatus};
use crate::store::ReportStore;

pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Everything known about an incident before the user submits it.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedIncident {
    pub image: ImageRef,
    pub captured_at: OffsetDateTime,
    pub location: Option<Coords>,
    pub address: Option<String>,
}

pub async fn capture_incident<C, L>(camera: &C, locator: &L) -> Result<CapturedIncident, CaptureError>
where
    C: Camera,
    L: Locator,
{
    let image = camera.capture().await?;
    let captured_at = OffsetDateTime::now_utc();

    let location = match locator.position().await {
        Ok(coords) => Some(coords),
        Err(e) => {
            tracing::info!(error = %e, "No position fix, report will not be geotagged");
            None
        }
    };

    let address = match location {
        Some(coords) => match locator.reverse_geocode(coords).await {
            Ok(placemarks) => geocode::address_label(&placemarks),
            Err(e) => {
                tracing::info!(error = %e, "Reverse geocoding failed");
                None
            }
        },
        None => None,
    };

    tracing::debug!(image = %image.0, has_location = location.is_some(), "Incident captured");
    Ok(CapturedIncident {
        image,
        captured_at,
        location,
        address,
    })
}

/// Client-side temporary id; never collides with numeric server ids.
pub fn local_report_id(now: OffsetDateTime) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..0x100_0000);
    format!("local-{}-{suffix:06x}", unix_millis(now))
}

/// Storage path for a new upload, e.g. `images/1718000000000-48213.jpg`.
pub fn upload_path(now: OffsetDateTime) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("images/{}-{suffix}.jpg", unix_millis(now))
}

fn unix_millis(now: OffsetDateTime) -> i128 {
    now.unix_timestamp_nanos() / 1_000_000
}

/// Pending report built from a capture; shown before any upload starts.
pub fn pending_report(incident: &CapturedIncident, description: &str) -> Report {
    Report {
        id: local_report_id(OffsetDateTime::now_utc()),
        submission_id: Some(Uuid::new_v4()),
        local_media_ref: Some(incident.image.0.clone()),
        remote_media_ref: None,
        description: description.trim().to_string(),
        created_at: incident.captured_at,
        location: incident.location,
        address: incident.address.clone(),
        status: ReportStatus::Pending,
    }
}

/// Adds the incident to `store` as pending and runs the upload. Returns the
/// local id; on error the entry stays in the store marked failed.
pub async fn submit_report<C, S, R>(
    store: &ReportStore,
    camera: &C,
    storage: &S,
    relational: &R,
    incident: &CapturedIncident,
    description: &str,
    config: &Config,
) -> Result<String, SubmitError>
where
    C: Camera,
    S: ObjectStorage,
    R: RelationalStore,
{
    let report = pending_report(incident, description);
    let id = report.id.clone();
    store.add_report(report.clone());

    match upload_report(camera, storage, relational, incident, &report, config.request_timeout()).await {
        Ok(public_url) => {
            store.update_report(&id, ReportPatch::uploaded(public_url));
            tracing::info!(%id, "Report uploaded");
            Ok(id)
        }
        Err(e) => {
            store.update_report(&id, ReportPatch::failed());
            tracing::warn!(%id, stage = %e.stage(), error = %e, "Report upload failed");
            Err(e)
        }
    }
}

async fn upload_report<C, S, R>(
    camera: &C,
    storage: &S,
    relational: &R,
    incident: &CapturedIncident,
    report: &Report,
    limit: Duration,
) -> Result<String, SubmitError>
where
    C: Camera,
    S: ObjectStorage,
    R: RelationalStore,
{
    let bytes = within(SubmitStage::ReadImage, limit, camera.load(&incident.image))
        .await?
        .map_err(SubmitError::ReadImage)?;

    let path = upload_path(OffsetDateTime::now_utc());
    tracing::debug!(%path, bytes = bytes.len(), "Uploading photo");
    let media = within(SubmitStage::Upload, limit, storage.upload(&path, bytes, IMAGE_CONTENT_TYPE))
        .await?
        .map_err(SubmitError::Upload)?;
    let public_url = storage.public_url(&media);

    let row = NewReportRow {
        submission_id: report.submission_id.unwrap_or_else(Uuid::new_v4),
        created_at: report.created_at,
        photo_url: public_url.clone(),
        description: report.description.clone(),
        address: report.address.clone(),
        lat: report.location.map(|c| c.lat),
        lng: report.location.map(|c| c.lng),
    };
    let inserted = within(SubmitStage::Insert, limit, relational.insert(row))
        .await?
        .map_err(SubmitError::Insert)?;
    tracing::debug!(server_id = %inserted.id, "Report row inserted");

    Ok(public_url)
}

async fn within<F: Future>(stage: SubmitStage, limit: Duration, fut: F) -> Result<F::Output, SubmitError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| SubmitError::Timeout { stage, after: limit })
}
