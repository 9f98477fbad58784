//! Credential store errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
    migrate::MigrateError,
};
use thiserror::Error;

/// Credential store error variants.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The credential was not found for this user and namespace.
    #[error("credential not found")]
    NotFound,

    /// A credential with this id already exists.
    #[error("credential already exists")]
    AlreadyExists,

    /// The connection string matches no supported backend.
    #[error(
        "unrecognized database url: expected postgresql://..., sqlite://path, file:path, \
         :memory: or a .db/.sqlite/.sqlite3 path"
    )]
    UnsupportedDatabaseUrl,

    /// Schema migration failed.
    #[error("failed to migrate credential store")]
    Migrate(#[source] MigrateError),

    /// Underlying SQL/storage error.
    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for StoreError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            _ => Self::Sql(error),
        }
    }
}

impl From<MigrateError> for StoreError {
    fn from(error: MigrateError) -> Self {
        Self::Migrate(error)
    }
}
