use std::str::FromStr;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::storage_error;

pub struct SqlStoreFactory;

impl SqlStoreFactory {
    /// Open (creating if missing) the database at `url`, e.g.
    /// `sqlite://campus.db` or `sqlite::memory:`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let mut opts = SqliteConnectOptions::from_str(url)
            .map_err(|e| storage_error(e, "database url"))?
            .create_if_missing(true)
            .foreign_keys(true);
        if !in_memory {
            opts = opts.journal_mode(SqliteJournalMode::Wal);
        }

        // An in-memory database lives and dies with its connection.
        let pool_opts = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_opts
            .connect_with(opts)
            .await
            .map_err(|e| storage_error(e, "connect"))?;

        info!(url = %url, in_memory, "storage.connected");
        Ok(pool)
    }

    pub async fn connect_memory() -> Result<SqlitePool> {
        Self::connect("sqlite::memory:", 1).await
    }
}
