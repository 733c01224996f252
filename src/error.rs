//! Error taxonomy shared by the store, the importer and the HTTP layer.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The two catalogue entity types, used to label lookups and conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntityKind {
    Film,
    Planet,
}

impl EntityKind {
    /// Name of the natural key column for this entity type.
    pub fn natural_key(self) -> &'static str {
        match self {
            EntityKind::Film => "title",
            EntityKind::Planet => "name",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Film => "film",
            EntityKind::Planet => "planet",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Film => f.write_str("Film"),
            EntityKind::Planet => f.write_str("Planet"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{kind} with id {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("A {} with {} \"{key}\" already exists in the database", .kind.label(), .kind.natural_key())]
    Conflict { kind: EntityKind, key: String },

    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("upstream returned HTTP {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn not_found(kind: EntityKind, id: i64) -> Self {
        AppError::NotFound { kind, id }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Translate a unique-constraint failure on the natural key into `Conflict`;
    /// any other database error passes through unchanged.
    pub fn from_write(err: sqlx::Error, kind: EntityKind, key: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::Conflict {
                    kind,
                    key: key.to_string(),
                };
            }
        }
        AppError::Database(err)
    }

    /// Stable machine-readable code carried in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound { .. } => "not_found",
            AppError::Conflict { .. } => "conflict",
            AppError::Validation { .. } => "validation_error",
            AppError::Upstream(_) | AppError::UpstreamStatus { .. } => "upstream_failure",
            AppError::Database(_) | AppError::Migrate(_) => "internal_error",
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    detail: String,
    code: &'a str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream(_) | AppError::UpstreamStatus { .. } => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Migrate(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "request failed");
        }
        // Internal failures keep their details in the log only.
        let detail = match self {
            AppError::Database(_) | AppError::Migrate(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(status).json(ErrorBody {
            detail,
            code: self.code(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_kind_and_id() {
        let err = AppError::not_found(EntityKind::Planet, 42);
        assert_eq!(err.to_string(), "Planet with id 42 not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflict_mentions_natural_key() {
        let err = AppError::Conflict {
            kind: EntityKind::Film,
            key: "A New Hope".into(),
        };
        assert_eq!(
            err.to_string(),
            "A film with title \"A New Hope\" already exists in the database"
        );
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "conflict");
    }

    #[test]
    fn non_unique_database_errors_pass_through() {
        let err = AppError::from_write(sqlx::Error::RowNotFound, EntityKind::Planet, "Hoth");
        assert!(matches!(err, AppError::Database(sqlx::Error::RowNotFound)));
    }
}
