use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("No camera frame available: {0}")]
    NoFrame(String),

    #[error("Could not read captured image {image_ref}: {reason}")]
    Unreadable { image_ref: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PositionUnavailable {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position fix timed out")]
    Timeout,

    #[error("Position unavailable: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
#[error("Reverse geocoding failed: {0}")]
pub struct GeocodeError(pub String);

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

#[derive(Debug, thiserror::Error)]
pub enum InsertError {
    #[error("Insert rejected: {0}")]
    Rejected(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Query failed: {0}")]
    Other(String),
}

/// Pipeline stage a submission failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStage {
    ReadImage,
    Upload,
    Insert,
}

impl std::fmt::Display for SubmitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            SubmitStage::ReadImage => "read_image",
            SubmitStage::Upload => "upload",
            SubmitStage::Insert => "insert",
        };
        write!(f, "{value}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Could not read photo: {0}")]
    ReadImage(#[source] CaptureError),

    #[error("Upload failed: {0}")]
    Upload(#[source] UploadError),

    #[error("Saving report failed: {0}")]
    Insert(#[source] InsertError),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: SubmitStage, after: Duration },
}

impl SubmitError {
    pub fn stage(&self) -> SubmitStage {
        match self {
            SubmitError::ReadImage(_) => SubmitStage::ReadImage,
            SubmitError::Upload(_) => SubmitStage::Upload,
            SubmitError::Insert(_) => SubmitStage::Insert,
            SubmitError::Timeout { stage, .. } => *stage,
        }
    }
}
