//! Canonical dataset import from the public Star Wars API.

pub mod client;
pub mod ingest;

pub use client::SwapiClient;
pub use ingest::{import_official_data, import_on_startup, ImportSummary};
