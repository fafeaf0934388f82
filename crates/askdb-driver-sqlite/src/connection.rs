//! SQLite connection implementation

use askdb_core::{
    AskdbError, ColumnDescriptor, ColumnMeta, Connection, PrimaryKeyStyle, QueryResult, Result,
    Row, SchemaDocument, SchemaIntrospection, StatementResult, Value,
};
use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection as RusqliteConnection, OpenFlags, params_from_iter};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::schema::{self, ReflectOptions};

/// SQLite connection wrapper
pub struct SqliteConnection {
    conn: Mutex<RusqliteConnection>,
    path: String,
    read_only: bool,
    closed: AtomicBool,
}

impl SqliteConnection {
    /// Open a SQLite database, creating the file if it does not exist
    pub fn open(path: &str) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database");
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::open_with_flags(path, flags, false)
    }

    /// Open an existing SQLite database without write access.
    ///
    /// Fails with a connection error if the file does not exist.
    pub fn open_read_only(path: &str) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database read-only");
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::open_with_flags(path, flags, true)
    }

    fn open_with_flags(path: &str, flags: OpenFlags, read_only: bool) -> Result<Self> {
        let expanded_path = Self::expand_path(path)?;

        let conn = if path == ":memory:" {
            RusqliteConnection::open_in_memory().map_err(|e| {
                AskdbError::Connection(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            if !expanded_path.starts_with("file:") {
                let file_path = std::path::Path::new(&expanded_path);
                if let Some(parent) = file_path.parent()
                    && !parent.exists()
                {
                    return Err(AskdbError::Connection(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
                tracing::error!(error = %e, path = %expanded_path, "failed to open SQLite database");
                AskdbError::Connection(format!(
                    "Failed to open SQLite database at '{}': {}",
                    expanded_path, e
                ))
            })?
        };

        conn.pragma_update(None, "foreign_keys", "ON").map_err(|e| {
            AskdbError::Connection(format!("Failed to enable foreign keys: {}", e))
        })?;

        tracing::info!(path = %expanded_path, read_only, "SQLite database connection established");
        Ok(Self {
            conn: Mutex::new(conn),
            path: expanded_path,
            read_only,
            closed: AtomicBool::new(false),
        })
    }

    /// Expand path to handle ~ (home directory) and relative paths
    fn expand_path(path: &str) -> Result<String> {
        if path == ":memory:" || path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            let Some(home) = std::env::var_os("HOME") else {
                return Err(AskdbError::Configuration(
                    "Unable to determine HOME directory".into(),
                ));
            };
            std::path::PathBuf::from(home)
                .join(rest)
                .to_string_lossy()
                .to_string()
        } else if path.starts_with('~') {
            return Err(AskdbError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        let result = if path_buf.is_relative() {
            std::env::current_dir()
                .map_err(AskdbError::Io)?
                .join(path_buf)
                .to_string_lossy()
                .to_string()
        } else {
            expanded
        };

        Ok(result)
    }

    /// Absolute path of the database file (or `:memory:`)
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn lock(&self) -> Result<MutexGuard<'_, RusqliteConnection>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(AskdbError::Connection("Connection is closed".into()));
        }
        Ok(self.conn.lock())
    }

    /// Execute a script of several statements, e.g. a seeding script
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        tracing::debug!("executing SQL batch");
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| AskdbError::Query(format!("Failed to execute batch: {}", e)))
    }

    /// Reflect all user tables into a schema document
    pub fn reflect_schema(&self, options: ReflectOptions) -> Result<SchemaDocument> {
        let conn = self.lock()?;
        Ok(schema::reflect_schema_with(&conn, options)?)
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let conn = self.lock()?;
        let rusqlite_params = values_to_rusqlite(params);

        let rows_affected = conn
            .execute(sql, params_from_iter(rusqlite_params.iter()))
            .map_err(|e| AskdbError::Query(format!("Failed to execute statement: {}", e)))?;

        tracing::debug!(affected_rows = rows_affected, "statement executed");
        Ok(StatementResult {
            affected_rows: rows_affected as u64,
        })
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = std::time::Instant::now();

        let conn = self.lock()?;
        let rusqlite_params = values_to_rusqlite(params);

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| AskdbError::Query(format!("Failed to prepare query: {}", e)))?;

        // Declared types come from sqlite3_column_decltype; expressions have none
        let columns: Vec<ColumnMeta> = stmt
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| ColumnMeta {
                name: col.name().to_string(),
                data_type: col.decl_type().unwrap_or("DYNAMIC").to_string(),
                ordinal: idx,
            })
            .collect();
        let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

        let mut rows = Vec::new();
        let mut query_rows = stmt
            .query(params_from_iter(rusqlite_params.iter()))
            .map_err(|e| AskdbError::Query(format!("Failed to execute query: {}", e)))?;

        while let Some(row) = query_rows
            .next()
            .map_err(|e| AskdbError::Query(format!("Failed to fetch row: {}", e)))?
        {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(rusqlite_to_value(row, i)?);
            }
            rows.push(Row::new(column_names.clone(), values));
        }

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            row_count = rows.len(),
            execution_time_ms = execution_time_ms,
            "query executed successfully"
        );
        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms,
        })
    }

    async fn close(&self) -> Result<()> {
        tracing::info!(path = %self.path, "closing SQLite connection");
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

#[async_trait]
impl SchemaIntrospection for SqliteConnection {
    #[tracing::instrument(skip(self))]
    async fn list_tables(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let tables = schema::list_user_tables(&conn)?;
        tracing::debug!(table_count = tables.len(), "tables listed");
        Ok(tables)
    }

    #[tracing::instrument(skip(self))]
    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let conn = self.lock()?;
        Ok(schema::table_columns(&conn, table)?)
    }

    // Holds the lock across the whole reflection so the document reflects a
    // single state of the catalog.
    #[tracing::instrument(skip(self))]
    async fn schema_document(&self, style: PrimaryKeyStyle) -> Result<SchemaDocument> {
        let conn = self.lock()?;
        let options = ReflectOptions::default().with_primary_key_style(style);
        Ok(schema::reflect_schema_with(&conn, options)?)
    }
}

/// Convert our Value types to rusqlite-compatible types
fn values_to_rusqlite(values: &[Value]) -> Vec<rusqlite::types::Value> {
    values.iter().map(value_to_rusqlite).collect()
}

fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(if *b { 1 } else { 0 }),
        Value::Int64(i) => rusqlite::types::Value::Integer(*i),
        Value::Float64(f) => rusqlite::types::Value::Real(*f),
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

/// Convert rusqlite row value to our Value type
fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| AskdbError::Query(e.to_string()))?;

    let value = match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        // Text stored in untyped columns can come back as a BLOB
        ValueRef::Blob(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => Value::Bytes(b.to_vec()),
        },
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_and_execute() {
        let conn = SqliteConnection::open(":memory:").expect("Failed to open in-memory db");

        conn.execute(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT)",
            &[],
        )
        .await
        .expect("Failed to create table");

        let inserted = conn
            .execute(
                "INSERT INTO users (name, email) VALUES (?, ?)",
                &[Value::from("Alice"), Value::Null],
            )
            .await
            .expect("Failed to insert");
        assert_eq!(inserted.affected_rows, 1);

        let result = conn
            .query("SELECT id, name, email, 1 + 1 AS two FROM users", &[])
            .await
            .expect("Failed to query");

        assert_eq!(result.row_count(), 1);
        assert_eq!(result.column_names(), vec!["id", "name", "email", "two"]);
        assert_eq!(result.columns[0].data_type, "INTEGER");
        assert_eq!(result.columns[3].data_type, "DYNAMIC");

        let row = &result.rows[0];
        assert_eq!(row.get_by_name("name"), Some(&Value::from("Alice")));
        assert_eq!(row.get_by_name("email"), Some(&Value::Null));
        assert_eq!(row.get_by_name("two"), Some(&Value::Int64(2)));
    }

    #[tokio::test]
    async fn test_invalid_sql_is_query_error() {
        let conn = SqliteConnection::open(":memory:").unwrap();

        let err = conn.query("SELEC nonsense", &[]).await.unwrap_err();
        assert!(err.is_query());
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_calls() {
        let conn = SqliteConnection::open(":memory:").unwrap();
        conn.close().await.unwrap();

        assert!(conn.is_closed());
        let err = conn.query("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, AskdbError::Connection(_)));
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(SqliteConnection::expand_path(":memory:").unwrap(), ":memory:");
        assert_eq!(
            SqliteConnection::expand_path("file:test.db?mode=ro").unwrap(),
            "file:test.db?mode=ro"
        );
        assert!(
            std::path::Path::new(&SqliteConnection::expand_path("shop.db").unwrap()).is_absolute()
        );
        assert!(SqliteConnection::expand_path("~other/shop.db").is_err());
    }
}
