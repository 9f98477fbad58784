//! Database Config

use std::time::Duration;

use clap::Args;

use crate::store::PoolSettings;

/// Credential store settings.
#[derive(Debug, Clone, Args)]
pub struct DatabaseConfig {
    /// Connection string: `postgres://...`, `sqlite://path`, `sqlite::memory:` or a `.db` path
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Maximum open connections to a networked database
    #[arg(long, env = "DB_MAX_OPEN_CONNS", default_value_t = 25)]
    pub db_max_open_conns: u32,

    /// Connections kept open while idle
    #[arg(long, env = "DB_MAX_IDLE_CONNS", default_value_t = 5)]
    pub db_max_idle_conns: u32,

    /// Maximum connection lifetime in seconds
    #[arg(long, env = "DB_CONN_MAX_LIFETIME_SECONDS", default_value_t = 300)]
    pub db_conn_max_lifetime_seconds: u64,
}

impl DatabaseConfig {
    /// Pool sizing; idle connections are capped at the open-connection limit.
    #[must_use]
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_open: self.db_max_open_conns,
            max_idle: self.db_max_idle_conns.min(self.db_max_open_conns),
            max_lifetime: Duration::from_secs(self.db_conn_max_lifetime_seconds),
        }
    }
}
