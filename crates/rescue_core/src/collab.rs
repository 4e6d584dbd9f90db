//! Interfaces of the external services the core talks to.
//!
//! The store itself never touches these; the capture and fetch flows do.

#![allow(async_fn_in_trait)]

use crate::error::{CaptureError, GeocodeError, InsertError, PositionUnavailable, QueryError, UploadError};
use crate::geocode::Placemark;
use crate::schema::{Coords, NewReportRow, RemoteRow};

/// Reference to a captured frame on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef(pub String);

pub trait Camera {
    async fn capture(&self) -> Result<ImageRef, CaptureError>;

    /// Reads the bytes behind a previously captured frame.
    async fn load(&self, image: &ImageRef) -> Result<Vec<u8>, CaptureError>;
}

pub trait Locator {
    async fn position(&self) -> Result<Coords, PositionUnavailable>;

    /// Best effort; an empty list is not an error.
    async fn reverse_geocode(&self, coords: Coords) -> Result<Vec<Placemark>, GeocodeError>;
}

/// Opaque handle returned by an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef(pub String);

pub trait ObjectStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<MediaRef, UploadError>;
    fn public_url(&self, media: &MediaRef) -> String;
}

pub trait RelationalStore {
    async fn insert(&self, row: NewReportRow) -> Result<RemoteRow, InsertError>;

    /// Newest `created_at` first.
    async fn query(&self, limit: usize) -> Result<Vec<RemoteRow>, QueryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub username: Option<String>,
}

pub type SessionCallback = Box<dyn Fn(Option<&Session>) + Send + Sync>;

/// Only used to gate navigation; reports do not carry the session.
pub trait AuthProvider {
    async fn session(&self) -> Option<Session>;
    fn on_session_change(&self, callback: SessionCallback);
}
