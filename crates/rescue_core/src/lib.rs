//! Core of the PetSOS incident reporter: the report model, the in-memory
//! reconciliation store, and the capture and fetch flows that feed it.

pub mod capture;
pub mod collab;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod geocode;
pub mod media;
pub mod reconcile;
pub mod schema;
pub mod store;

pub use schema::{Coords, Report, ReportPatch, ReportStatus};
pub use store::ReportStore;
