//! holocron: a films/planets catalogue service with a one-shot import of the
//! canonical Star Wars dataset.

pub mod api;
pub mod config;
pub mod database_ops;
pub mod error;
pub mod logging;

pub mod util {
    pub mod env;
}

pub use config::{AppConfig, ImportConfig};
pub use database_ops::db::Db;
pub use error::{AppError, EntityKind, Result};
