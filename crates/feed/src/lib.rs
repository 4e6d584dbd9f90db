//! Community feed view over the report store.

pub mod card;
pub mod export;

pub use card::{display_offset, render_feed};
pub use export::export_feed;
