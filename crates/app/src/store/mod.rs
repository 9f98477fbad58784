//! Named-credential metadata store
//!
//! One trait, two backends: an embedded single-writer `SQLite` database and a networked
//! `PostgreSQL` database. The backend is chosen from the shape of the connection string.

use std::{path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use tiergate::{CredentialRecord, NewCredentialRecord};

pub mod errors;
mod postgres;
mod sqlite;

pub use errors::StoreError;
pub use postgres::PgCredentialStore;
pub use sqlite::SqliteCredentialStore;

/// Persistence of named-credential records.
///
/// Every lookup is scoped by `(namespace, username)`; the same username has independent
/// records in each tier namespace.
#[automock]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a newly issued named credential.
    async fn add(&self, record: NewCredentialRecord) -> Result<CredentialRecord, StoreError>;

    /// A user's records in a namespace, newest first.
    async fn list_for_user(
        &self,
        namespace: &str,
        username: &str,
    ) -> Result<Vec<CredentialRecord>, StoreError>;

    /// A single record.
    async fn get(
        &self,
        namespace: &str,
        username: &str,
        id: &str,
    ) -> Result<CredentialRecord, StoreError>;

    /// Expire one record at `now`. Returns `false` when it was already expired.
    async fn mark_expired(
        &self,
        namespace: &str,
        username: &str,
        id: &str,
        now: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Expire every unexpired record of a user in a namespace. Returns the number of records
    /// changed.
    async fn mark_all_expired_for_user(
        &self,
        namespace: &str,
        username: &str,
        now: Timestamp,
    ) -> Result<u64, StoreError>;

    /// Deny-list lookup by token hash.
    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<CredentialRecord>, StoreError>;

    /// Physically remove a record.
    async fn delete(&self, namespace: &str, username: &str, id: &str) -> Result<(), StoreError>;

    /// Create the schema if missing.
    async fn migrate(&self) -> Result<(), StoreError>;

    /// Close the underlying pool.
    async fn close(&self);
}

/// A parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// `postgres://` or `postgresql://`.
    Postgres(String),

    /// Private in-memory `SQLite` database.
    SqliteMemory,

    /// `SQLite` database file.
    SqliteFile(PathBuf),
}

const SQLITE_MEMORY: &str = ":memory:";

impl DatabaseUrl {
    /// Classify a connection string.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedDatabaseUrl`] for unrecognized shapes.
    pub fn parse(url: &str) -> Result<Self, StoreError> {
        let url = url.trim();

        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return Ok(Self::Postgres(url.to_string()));
        }

        if url == SQLITE_MEMORY || url == "sqlite::memory:" {
            return Ok(Self::SqliteMemory);
        }

        if let Some(path) = url.strip_prefix("sqlite://") {
            return Ok(match path {
                "" | SQLITE_MEMORY => Self::SqliteMemory,
                path => Self::SqliteFile(PathBuf::from(path)),
            });
        }

        if let Some(rest) = url.strip_prefix("file:") {
            let path = rest.split_once('?').map_or(rest, |(path, _query)| path);

            return Ok(match path {
                "" | SQLITE_MEMORY => Self::SqliteMemory,
                path => Self::SqliteFile(PathBuf::from(path)),
            });
        }

        if [".db", ".sqlite", ".sqlite3"]
            .iter()
            .any(|suffix| url.ends_with(suffix))
        {
            return Ok(Self::SqliteFile(PathBuf::from(url)));
        }

        Err(StoreError::UnsupportedDatabaseUrl)
    }
}

/// Pool sizing for the networked backend. The embedded backend always uses one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum open connections.
    pub max_open: u32,

    /// Connections kept open while idle.
    pub max_idle: u32,

    /// Maximum lifetime of a connection.
    pub max_lifetime: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_open: 25,
            max_idle: 5,
            max_lifetime: Duration::from_secs(300),
        }
    }
}

/// Connect to the backend selected by `url`.
///
/// The schema is not created; call [`CredentialStore::migrate`].
///
/// # Errors
///
/// Returns an error for unsupported URLs or when the connection fails.
pub async fn connect(
    url: &str,
    settings: PoolSettings,
) -> Result<Arc<dyn CredentialStore>, StoreError> {
    Ok(match DatabaseUrl::parse(url)? {
        DatabaseUrl::Postgres(url) => Arc::new(PgCredentialStore::connect(&url, settings).await?),
        DatabaseUrl::SqliteMemory => Arc::new(SqliteCredentialStore::in_memory().await?),
        DatabaseUrl::SqliteFile(path) => Arc::new(SqliteCredentialStore::open(&path).await?),
    })
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn parses_postgres_urls() -> TestResult {
        assert_eq!(
            DatabaseUrl::parse("postgres://u:p@localhost/db")?,
            DatabaseUrl::Postgres("postgres://u:p@localhost/db".to_string())
        );
        assert!(matches!(
            DatabaseUrl::parse(" postgresql://localhost/db ")?,
            DatabaseUrl::Postgres(_)
        ));

        Ok(())
    }

    #[test]
    fn parses_sqlite_memory_forms() -> TestResult {
        for url in [":memory:", "sqlite://", "sqlite://:memory:", "sqlite::memory:"] {
            assert_eq!(DatabaseUrl::parse(url)?, DatabaseUrl::SqliteMemory, "{url}");
        }

        Ok(())
    }

    #[test]
    fn parses_sqlite_file_forms() -> TestResult {
        assert_eq!(
            DatabaseUrl::parse("sqlite:///var/lib/tiergate/tokens.db")?,
            DatabaseUrl::SqliteFile(PathBuf::from("/var/lib/tiergate/tokens.db"))
        );
        assert_eq!(
            DatabaseUrl::parse("file:data/tokens?mode=rwc")?,
            DatabaseUrl::SqliteFile(PathBuf::from("data/tokens"))
        );

        for url in ["tokens.db", "tokens.sqlite", "/tmp/tokens.sqlite3"] {
            assert!(
                matches!(DatabaseUrl::parse(url)?, DatabaseUrl::SqliteFile(_)),
                "{url} should be a sqlite file"
            );
        }

        Ok(())
    }

    #[test]
    fn rejects_unknown_urls() {
        for url in ["mysql://localhost/db", "tokens.txt", ""] {
            assert!(
                matches!(
                    DatabaseUrl::parse(url),
                    Err(StoreError::UnsupportedDatabaseUrl)
                ),
                "{url:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn connect_opens_in_memory_sqlite() -> TestResult {
        let store = connect(":memory:", PoolSettings::default()).await?;

        store.migrate().await?;

        assert!(store.list_for_user("ns", "alice").await?.is_empty());

        store.close().await;

        Ok(())
    }
}
