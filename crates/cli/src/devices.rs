//! Command-line stand-ins for the device collaborators.

use std::path::PathBuf;
use std::sync::Mutex;

use rescue_core::collab::{AuthProvider, Camera, ImageRef, Locator, Session, SessionCallback};
use rescue_core::error::{CaptureError, GeocodeError, PositionUnavailable};
use rescue_core::geocode::Placemark;
use rescue_core::Coords;

pub const USER_ENV: &str = "PETSOS_USER";

/// "Captures" an existing image file.
pub struct FileCamera {
    path: PathBuf,
}

impl FileCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Camera for FileCamera {
    async fn capture(&self) -> Result<ImageRef, CaptureError> {
        let meta = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| CaptureError::NoFrame(format!("{}: {e}", self.path.display())))?;
        if !meta.is_file() {
            return Err(CaptureError::NoFrame(format!("{} is not a file", self.path.display())));
        }
        let absolute = std::path::absolute(&self.path).unwrap_or_else(|_| self.path.clone());
        Ok(ImageRef(absolute.display().to_string()))
    }

    async fn load(&self, image: &ImageRef) -> Result<Vec<u8>, CaptureError> {
        tokio::fs::read(&image.0).await.map_err(|e| CaptureError::Unreadable {
            image_ref: image.0.clone(),
            reason: e.to_string(),
        })
    }
}

/// Position and place name given on the command line.
pub struct ArgsLocator {
    coords: Option<Coords>,
    address: Option<String>,
}

impl ArgsLocator {
    pub fn new(lat: Option<f64>, lng: Option<f64>, address: Option<String>) -> Self {
        let coords = match (lat, lng) {
            (Some(lat), Some(lng)) => Coords::new(lat, lng),
            _ => None,
        };
        Self { coords, address }
    }
}

impl Locator for ArgsLocator {
    async fn position(&self) -> Result<Coords, PositionUnavailable> {
        self.coords
            .ok_or_else(|| PositionUnavailable::Other("no valid --lat/--lng given".into()))
    }

    async fn reverse_geocode(&self, _coords: Coords) -> Result<Vec<Placemark>, GeocodeError> {
        Ok(self
            .address
            .iter()
            .map(|name| Placemark {
                name: Some(name.clone()),
                ..Placemark::default()
            })
            .collect())
    }
}

/// Session taken from the `PETSOS_USER` environment variable.
#[derive(Default)]
pub struct EnvAuth {
    session: Mutex<Option<Session>>,
    callbacks: Mutex<Vec<SessionCallback>>,
}

impl EnvAuth {
    pub fn from_env() -> Self {
        let auth = Self::default();
        if let Ok(user) = std::env::var(USER_ENV) {
            auth.set_session(Some(user));
        }
        auth
    }

    pub fn set_session(&self, user: Option<String>) {
        let session = user
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .map(|u| Session {
                user_id: u.clone(),
                username: Some(u),
            });
        *self.session.lock().unwrap_or_else(|p| p.into_inner()) = session.clone();
        for callback in self.callbacks.lock().unwrap_or_else(|p| p.into_inner()).iter() {
            callback(session.as_ref());
        }
    }
}

impl AuthProvider for EnvAuth {
    async fn session(&self) -> Option<Session> {
        self.session.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn on_session_change(&self, callback: SessionCallback) {
        self.callbacks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(callback);
    }
}
