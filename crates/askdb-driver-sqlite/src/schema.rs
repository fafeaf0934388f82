//! SQLite schema reflection
//!
//! Reads the table catalog (`sqlite_master`) and per-table column metadata
//! (`pragma_table_info`) and turns them into a [`SchemaDocument`]. Reflection
//! is read-only and all-or-nothing: the first failing catalog or column query
//! aborts it and nothing reflected so far is returned.

use askdb_core::{AskdbError, ColumnDescriptor, PrimaryKeyStyle, SchemaDocument, TableDescriptor};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name prefix SQLite reserves for its internal tables
/// (`sqlite_sequence`, `sqlite_stat1`, ...).
pub const SYSTEM_TABLE_PREFIX: &str = "sqlite_";

const CATALOG_QUERY: &str = "SELECT name FROM sqlite_master WHERE type = 'table'";

const COLUMNS_QUERY: &str = "SELECT cid, name, type, \"notnull\", dflt_value, pk \
     FROM pragma_table_info(?1) ORDER BY cid";

/// Error raised while reflecting a schema
#[derive(Error, Debug)]
pub enum ReflectionError {
    #[error("failed to open SQLite database at '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to read table catalog: {0}")]
    Catalog(#[source] rusqlite::Error),

    #[error("failed to read columns of table '{table}': {source}")]
    Columns {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
}

impl From<ReflectionError> for AskdbError {
    fn from(err: ReflectionError) -> Self {
        match err {
            ReflectionError::Open { .. } => AskdbError::Connection(err.to_string()),
            ReflectionError::Catalog(_) | ReflectionError::Columns { .. } => {
                AskdbError::Schema(err.to_string())
            }
        }
    }
}

/// Options controlling how the schema document is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReflectOptions {
    pub primary_key_style: PrimaryKeyStyle,
}

impl ReflectOptions {
    pub fn with_primary_key_style(mut self, style: PrimaryKeyStyle) -> Self {
        self.primary_key_style = style;
        self
    }
}

/// Whether `name` belongs to SQLite itself.
///
/// SQLite refuses to create user tables with this prefix in any letter case,
/// so the comparison is case-insensitive.
pub fn is_system_table(name: &str) -> bool {
    name.get(..SYSTEM_TABLE_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(SYSTEM_TABLE_PREFIX))
}

/// Reflect every user table of `conn` with default options
pub fn reflect_schema(conn: &Connection) -> Result<SchemaDocument, ReflectionError> {
    reflect_schema_with(conn, ReflectOptions::default())
}

/// Reflect every user table of `conn`
#[tracing::instrument(skip(conn))]
pub fn reflect_schema_with(
    conn: &Connection,
    options: ReflectOptions,
) -> Result<SchemaDocument, ReflectionError> {
    let names = list_user_tables(conn)?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let columns = table_columns(conn, &name)?;
        tables.push(TableDescriptor::new(name, columns));
    }

    tracing::debug!(table_count = tables.len(), "schema reflected");
    Ok(SchemaDocument::new(tables, options.primary_key_style))
}

/// Open the database file read-only, reflect it and close it again.
///
/// The file is never created; a missing or unreadable file is reported as
/// [`ReflectionError::Open`].
pub fn reflect_schema_at(
    path: impl AsRef<Path>,
    options: ReflectOptions,
) -> Result<SchemaDocument, ReflectionError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "opening database read-only for reflection");
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;

    let conn = Connection::open_with_flags(path, flags).map_err(|source| {
        tracing::error!(error = %source, "failed to open database for reflection");
        ReflectionError::Open {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let document = reflect_schema_with(&conn, options)?;

    if let Err((_, e)) = conn.close() {
        tracing::warn!(error = %e, "failed to close reflection connection");
    }
    Ok(document)
}

/// User table names in catalog order
pub(crate) fn list_user_tables(conn: &Connection) -> Result<Vec<String>, ReflectionError> {
    tracing::trace!("listing tables from sqlite_master");
    let mut stmt = conn.prepare(CATALOG_QUERY).map_err(ReflectionError::Catalog)?;

    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(ReflectionError::Catalog)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(ReflectionError::Catalog)?;

    Ok(names.into_iter().filter(|n| !is_system_table(n)).collect())
}

/// Columns of `table` in declaration order
pub(crate) fn table_columns(
    conn: &Connection,
    table: &str,
) -> Result<Vec<ColumnDescriptor>, ReflectionError> {
    tracing::trace!(table = %table, "fetching column information");
    let columns_error = |source: rusqlite::Error| ReflectionError::Columns {
        table: table.to_string(),
        source,
    };

    let mut stmt = conn.prepare(COLUMNS_QUERY).map_err(columns_error)?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(ColumnDescriptor {
                position: row.get::<_, i64>(0)? as usize,
                name: row.get(1)?,
                declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                not_null: row.get::<_, i64>(3)? != 0,
                default_value: row.get(4)?,
                primary_key: row.get::<_, i64>(5)? as u32,
            })
        })
        .map_err(columns_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(columns_error)?;

    Ok(columns)
}
