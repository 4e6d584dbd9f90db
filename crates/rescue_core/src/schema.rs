use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// Upload state of a single report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Uploaded,
    Failed,
}

impl ReportStatus {
    /// Whether the local state machine allows moving from `self` to `next`.
    /// Same-state moves are not transitions and return false.
    pub fn can_advance_to(self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::Pending, ReportStatus::Uploaded) | (ReportStatus::Pending, ReportStatus::Failed)
        )
    }

    /// Entries the server has not confirmed yet.
    pub fn is_local_only(self) -> bool {
        matches!(self, ReportStatus::Pending | ReportStatus::Failed)
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Uploaded => "uploaded",
            ReportStatus::Failed => "failed",
        };
        write!(f, "{value}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coords {
    pub lat: f64,
    pub lng: f64,
}

impl Coords {
    /// Returns `None` for non-finite or out-of-range pairs.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }
        Some(Self { lat, lng })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Report {
    pub id: String,                       // "local-..." until the server row replaces it
    pub submission_id: Option<Uuid>,      // idempotency key carried to the server row
    pub local_media_ref: Option<String>,  // on-device image, preview only
    pub remote_media_ref: Option<String>, // public URL once uploaded
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    #[schemars(with = "String")]
    pub created_at: OffsetDateTime,       // capture time, not upload time
    pub location: Option<Coords>,
    pub address: Option<String>,
    pub status: ReportStatus,
}

impl Report {
    /// Image to show in the feed: remote copy first, local preview otherwise.
    pub fn display_media(&self) -> Option<&str> {
        self.remote_media_ref
            .as_deref()
            .or(self.local_media_ref.as_deref())
    }
}

/// Partial update applied by `ReportStore::update_report`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPatch {
    pub status: Option<ReportStatus>,
    pub remote_media_ref: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
}

impl ReportPatch {
    pub fn uploaded(remote_media_ref: impl Into<String>) -> Self {
        Self {
            status: Some(ReportStatus::Uploaded),
            remote_media_ref: Some(remote_media_ref.into()),
            ..Self::default()
        }
    }

    pub fn failed() -> Self {
        Self {
            status: Some(ReportStatus::Failed),
            ..Self::default()
        }
    }
}

/// Row shape inserted into the relational store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReportRow {
    pub submission_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub photo_url: String,
    pub description: String,
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Row as returned by the relational store. Every column except `id` may be
/// missing on older or partially written rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RemoteRow {
    pub id: String,
    pub submission_id: Option<Uuid>,
    pub created_at: Option<String>,
    pub photo_url: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl RemoteRow {
    /// Normalizes the row into a confirmed report. A row without a photo URL
    /// is still confirmed; it is shown with a placeholder instead of an image.
    pub fn into_report(self, now: OffsetDateTime) -> Report {
        let photo_url = self.photo_url.filter(|url| !url.trim().is_empty());
        let created_at = self
            .created_at
            .as_deref()
            .and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
            .unwrap_or(now);
        let location = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Coords::new(lat, lng),
            _ => None,
        };

        Report {
            id: self.id,
            submission_id: self.submission_id,
            local_media_ref: None,
            remote_media_ref: photo_url,
            description: self.description.unwrap_or_default(),
            created_at,
            location,
            address: self.address.filter(|a| !a.trim().is_empty()),
            status: ReportStatus::Uploaded,
        }
    }
}
