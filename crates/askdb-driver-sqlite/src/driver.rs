//! SQLite driver implementation

use askdb_core::{AskdbError, Connection, ConnectionConfig, DatabaseDriver, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::SqliteConnection;

/// SQLite database driver
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }

    /// Open a concrete [`SqliteConnection`] for `config`.
    ///
    /// Honours the `read_only` parameter; read-only connections never create
    /// the database file.
    pub fn open(&self, config: &ConnectionConfig) -> Result<SqliteConnection> {
        let path = config.require_path()?;

        let conn = if config.get_bool("read_only") {
            SqliteConnection::open_read_only(&path)
        } else {
            SqliteConnection::open(&path)
        };

        conn.map_err(|e| {
            tracing::error!(error = %e, "failed to connect to SQLite database");
            match e {
                AskdbError::Connection(_) | AskdbError::Configuration(_) => e,
                other => AskdbError::Connection(format!(
                    "Failed to connect to SQLite database: {}",
                    other
                )),
            }
        })
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn display_name(&self) -> &'static str {
        "SQLite"
    }

    #[tracing::instrument(skip(self, config), fields(path = config.get_string("path").as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let conn = self.open(config)?;
        tracing::info!(path = %conn.path(), "SQLite connection created");
        Ok(Arc::new(conn))
    }

    #[tracing::instrument(skip(self, config))]
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()> {
        tracing::debug!("testing SQLite connection");
        let conn = self.connect(config).await?;
        conn.query("SELECT 1", &[]).await?;
        conn.close().await
    }
}
