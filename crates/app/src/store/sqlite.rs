//! `SQLite` credential store

use std::{path::Path, str::FromStr, time::Duration};

use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::{
    FromRow, Row, Sqlite, SqlitePool,
    migrate::Migrator,
    query, query_as,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow},
};
use tiergate::{CredentialRecord, NewCredentialRecord};
use tracing::info;

use crate::store::{CredentialStore, StoreError};

static MIGRATOR: Migrator = sqlx::migrate!("migrations/sqlite");

const CREATE_TOKEN_SQL: &str = include_str!("sql/sqlite/create_token.sql");
const LIST_TOKENS_FOR_USER_SQL: &str = include_str!("sql/sqlite/list_tokens_for_user.sql");
const GET_TOKEN_SQL: &str = include_str!("sql/sqlite/get_token.sql");
const FIND_TOKEN_BY_HASH_SQL: &str = include_str!("sql/sqlite/find_token_by_hash.sql");
const MARK_TOKEN_EXPIRED_SQL: &str = include_str!("sql/sqlite/mark_token_expired.sql");
const MARK_TOKENS_EXPIRED_FOR_USER_SQL: &str =
    include_str!("sql/sqlite/mark_tokens_expired_for_user.sql");
const DELETE_TOKEN_SQL: &str = include_str!("sql/sqlite/delete_token.sql");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Embedded single-writer credential store.
///
/// The pool holds exactly one connection that is never recycled, which serializes writers and
/// keeps an in-memory database alive for the lifetime of the store.
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        Self::with_options(options).await
    }

    /// Open (creating if missing) a database file in WAL mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        info!(path = %path.display(), "opening sqlite credential store");

        Self::with_options(options).await
    }

    async fn with_options(options: SqliteConnectOptions) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }
}

struct SqliteTokenRow(CredentialRecord);

impl<'r> FromRow<'r, SqliteRow> for SqliteTokenRow {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        Ok(Self(CredentialRecord {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            namespace: row.try_get("namespace")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: timestamp(row, "creation_date")?,
            expires_at: timestamp(row, "expiration_date")?,
            revoked_at: row
                .try_get::<Option<i64>, _>("revoked_at")?
                .map(|micros| from_micros("revoked_at", micros))
                .transpose()?,
        }))
    }
}

fn timestamp(row: &SqliteRow, column: &str) -> sqlx::Result<Timestamp> {
    from_micros(column, row.try_get(column)?)
}

fn from_micros(column: &str, micros: i64) -> sqlx::Result<Timestamp> {
    Timestamp::from_microsecond(micros).map_err(|error| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(error),
    })
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn add(&self, record: NewCredentialRecord) -> Result<CredentialRecord, StoreError> {
        let row = query_as::<Sqlite, SqliteTokenRow>(CREATE_TOKEN_SQL)
            .bind(record.id)
            .bind(record.username)
            .bind(record.namespace)
            .bind(record.name)
            .bind(record.description)
            .bind(record.created_at.as_microsecond())
            .bind(record.expires_at.as_microsecond())
            .bind(record.token_hash)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }

    async fn list_for_user(
        &self,
        namespace: &str,
        username: &str,
    ) -> Result<Vec<CredentialRecord>, StoreError> {
        let rows = query_as::<Sqlite, SqliteTokenRow>(LIST_TOKENS_FOR_USER_SQL)
            .bind(namespace)
            .bind(username)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.0).collect())
    }

    async fn get(
        &self,
        namespace: &str,
        username: &str,
        id: &str,
    ) -> Result<CredentialRecord, StoreError> {
        let row = query_as::<Sqlite, SqliteTokenRow>(GET_TOKEN_SQL)
            .bind(namespace)
            .bind(username)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }

    async fn mark_expired(
        &self,
        namespace: &str,
        username: &str,
        id: &str,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let result = query(MARK_TOKEN_EXPIRED_SQL)
            .bind(namespace)
            .bind(username)
            .bind(id)
            .bind(now.as_microsecond())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            self.get(namespace, username, id).await?;
            return Ok(false);
        }

        Ok(true)
    }

    async fn mark_all_expired_for_user(
        &self,
        namespace: &str,
        username: &str,
        now: Timestamp,
    ) -> Result<u64, StoreError> {
        let result = query(MARK_TOKENS_EXPIRED_FOR_USER_SQL)
            .bind(namespace)
            .bind(username)
            .bind(now.as_microsecond())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let row = query_as::<Sqlite, SqliteTokenRow>(FIND_TOKEN_BY_HASH_SQL)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.0))
    }

    async fn delete(&self, namespace: &str, username: &str, id: &str) -> Result<(), StoreError> {
        let result = query(DELETE_TOKEN_SQL)
            .bind(namespace)
            .bind(username)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR.run(&self.pool).await?;

        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::test::store as suite;

    use super::*;

    async fn store() -> TestResult<SqliteCredentialStore> {
        let store = SqliteCredentialStore::in_memory().await?;

        store.migrate().await?;

        Ok(store)
    }

    #[tokio::test]
    async fn add_and_get() -> TestResult {
        suite::add_and_get(&store().await?).await
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() -> TestResult {
        suite::duplicate_id_is_rejected(&store().await?).await
    }

    #[tokio::test]
    async fn list_is_empty_not_missing() -> TestResult {
        suite::list_is_empty_not_missing(&store().await?).await
    }

    #[tokio::test]
    async fn list_is_newest_first() -> TestResult {
        suite::list_is_newest_first(&store().await?).await
    }

    #[tokio::test]
    async fn records_are_isolated_by_namespace() -> TestResult {
        suite::records_are_isolated_by_namespace(&store().await?).await
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() -> TestResult {
        suite::get_unknown_is_not_found(&store().await?).await
    }

    #[tokio::test]
    async fn mark_expired_is_idempotent() -> TestResult {
        suite::mark_expired_is_idempotent(&store().await?).await
    }

    #[tokio::test]
    async fn mark_all_expired_is_scoped_and_idempotent() -> TestResult {
        suite::mark_all_expired_is_scoped_and_idempotent(&store().await?).await
    }

    #[tokio::test]
    async fn find_by_token_hash() -> TestResult {
        suite::find_by_token_hash(&store().await?).await
    }

    #[tokio::test]
    async fn delete_removes_record() -> TestResult {
        suite::delete_removes_record(&store().await?).await
    }

    #[tokio::test]
    async fn migrate_is_idempotent() -> TestResult {
        let store = store().await?;

        store.migrate().await?;
        suite::add_and_get(&store).await
    }

    #[tokio::test]
    async fn file_database_persists_across_reopen() -> TestResult {
        let path = std::env::temp_dir().join(format!("tiergate-{}.db", uuid::Uuid::now_v7()));

        let store = SqliteCredentialStore::open(&path).await?;
        store.migrate().await?;
        store.add(suite::new_record("ns", "alice", "persisted")).await?;
        store.close().await;

        let reopened = SqliteCredentialStore::open(&path).await?;
        reopened.migrate().await?;
        let records = reopened.list_for_user("ns", "alice").await?;
        reopened.close().await;

        let _cleanup = std::fs::remove_file(&path);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "persisted");

        Ok(())
    }
}
