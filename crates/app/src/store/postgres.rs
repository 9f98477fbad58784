//! `PostgreSQL` credential store

use async_trait::async_trait;
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{
    FromRow, PgPool, Postgres, Row,
    migrate::Migrator,
    postgres::{PgPoolOptions, PgRow},
    query, query_as,
};
use tiergate::{CredentialRecord, NewCredentialRecord};
use tracing::info;

use crate::store::{CredentialStore, PoolSettings, StoreError};

static MIGRATOR: Migrator = sqlx::migrate!("migrations/postgres");

const CREATE_TOKEN_SQL: &str = include_str!("sql/postgres/create_token.sql");
const LIST_TOKENS_FOR_USER_SQL: &str = include_str!("sql/postgres/list_tokens_for_user.sql");
const GET_TOKEN_SQL: &str = include_str!("sql/postgres/get_token.sql");
const FIND_TOKEN_BY_HASH_SQL: &str = include_str!("sql/postgres/find_token_by_hash.sql");
const MARK_TOKEN_EXPIRED_SQL: &str = include_str!("sql/postgres/mark_token_expired.sql");
const MARK_TOKENS_EXPIRED_FOR_USER_SQL: &str =
    include_str!("sql/postgres/mark_tokens_expired_for_user.sql");
const DELETE_TOKEN_SQL: &str = include_str!("sql/postgres/delete_token.sql");

/// Networked multi-writer credential store.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Wrap an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with the given pool sizing.
    ///
    /// `max_idle` connections are kept open; idle connections above that are reaped after
    /// `max_lifetime`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(url: &str, settings: PoolSettings) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_open)
            .min_connections(settings.max_idle.min(settings.max_open))
            .max_lifetime(Some(settings.max_lifetime))
            .idle_timeout(Some(settings.max_lifetime))
            .connect(url)
            .await?;

        info!(
            max_open = settings.max_open,
            max_idle = settings.max_idle,
            max_lifetime_seconds = settings.max_lifetime.as_secs(),
            "connected postgres credential store"
        );

        Ok(Self::new(pool))
    }
}

struct PgTokenRow(CredentialRecord);

impl<'r> FromRow<'r, PgRow> for PgTokenRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self(CredentialRecord {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            namespace: row.try_get("namespace")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get::<SqlxTimestamp, _>("creation_date")?.to_jiff(),
            expires_at: row
                .try_get::<SqlxTimestamp, _>("expiration_date")?
                .to_jiff(),
            revoked_at: row
                .try_get::<Option<SqlxTimestamp>, _>("revoked_at")?
                .map(SqlxTimestamp::to_jiff),
        }))
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn add(&self, record: NewCredentialRecord) -> Result<CredentialRecord, StoreError> {
        let row = query_as::<Postgres, PgTokenRow>(CREATE_TOKEN_SQL)
            .bind(record.id)
            .bind(record.username)
            .bind(record.namespace)
            .bind(record.name)
            .bind(record.description)
            .bind(SqlxTimestamp::from(record.created_at))
            .bind(SqlxTimestamp::from(record.expires_at))
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
        let rows = query_as::<Postgres, PgTokenRow>(LIST_TOKENS_FOR_USER_SQL)
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
        let row = query_as::<Postgres, PgTokenRow>(GET_TOKEN_SQL)
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
            .bind(SqlxTimestamp::from(now))
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
            .bind(SqlxTimestamp::from(now))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let row = query_as::<Postgres, PgTokenRow>(FIND_TOKEN_BY_HASH_SQL)
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
