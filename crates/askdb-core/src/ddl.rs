//! `CREATE TABLE` rendering for reflected tables
//!
//! The reflector in each driver produces [`TableDescriptor`]s straight from the
//! database's introspection facility; this module turns them into the schema
//! document handed to the training store. Rendering is dialect-neutral apart
//! from identifier quoting, which follows the ANSI double-quote convention that
//! SQLite, PostgreSQL and DuckDB all accept.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Separator placed between two rendered statements.
pub const STATEMENT_SEPARATOR: &str = "\n\n";

const INDENT: &str = "    ";

/// How primary key columns are annotated in rendered DDL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKeyStyle {
    /// Every key column carries its own `PRIMARY KEY` marker.
    ///
    /// For composite keys this produces DDL that SQLite rejects when
    /// re-executed ("table has more than one primary key"); it is kept as the
    /// default because it is what downstream prompts have always been trained on.
    #[default]
    PerColumn,
    /// Single-column keys stay inline; composite keys become a trailing
    /// `PRIMARY KEY (a, b)` table constraint.
    TableConstraint,
}

/// One column as reported by the database's introspection facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Declaration position (0-based)
    pub position: usize,
    pub name: String,
    /// Declared type exactly as written in the schema; may be empty
    pub declared_type: String,
    pub not_null: bool,
    /// Default value expression as stored in the schema
    pub default_value: Option<String>,
    /// 1-based position within the primary key, 0 when not a key column
    pub primary_key: u32,
}

impl ColumnDescriptor {
    /// Create a nullable, non-key column
    pub fn new(position: usize, name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            position,
            name: name.into(),
            declared_type: declared_type.into(),
            not_null: false,
            default_value: None,
            primary_key: 0,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Mark as the `key_position`-th column of the primary key (1-based)
    pub fn primary_key(mut self, key_position: u32) -> Self {
        self.primary_key = key_position;
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key > 0
    }

    fn render(&self, annotate_primary_key: bool) -> String {
        let mut line = String::from(INDENT);
        line.push_str(&quote_identifier(&self.name));
        if !self.declared_type.is_empty() {
            line.push(' ');
            line.push_str(&self.declared_type);
        }
        if self.not_null {
            line.push_str(" NOT NULL");
        }
        if annotate_primary_key && self.is_primary_key() {
            line.push_str(" PRIMARY KEY");
        }
        line
    }
}

/// A user table and its columns in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Key columns ordered by their position within the key
    pub fn primary_key_columns(&self) -> Vec<&ColumnDescriptor> {
        let mut keys: Vec<&ColumnDescriptor> =
            self.columns.iter().filter(|c| c.is_primary_key()).collect();
        keys.sort_by_key(|c| c.primary_key);
        keys
    }

    pub fn has_composite_key(&self) -> bool {
        self.columns.iter().filter(|c| c.is_primary_key()).count() > 1
    }

    /// Render a single `CREATE TABLE` statement
    pub fn to_create_table(&self, style: PrimaryKeyStyle) -> String {
        let table_constraint = style == PrimaryKeyStyle::TableConstraint && self.has_composite_key();

        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|column| column.render(!table_constraint))
            .collect();

        if table_constraint {
            let keys: Vec<Cow<'_, str>> = self
                .primary_key_columns()
                .into_iter()
                .map(|c| quote_identifier(&c.name))
                .collect();
            lines.push(format!("{}PRIMARY KEY ({})", INDENT, keys.join(", ")));
        }

        format!(
            "CREATE TABLE {} (\n{}\n);",
            quote_identifier(&self.name),
            lines.join(",\n")
        )
    }
}

/// Rendered DDL for a whole database.
///
/// Tables keep the order in which the catalog enumerated them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    tables: Vec<TableDescriptor>,
    style: PrimaryKeyStyle,
}

impl SchemaDocument {
    pub fn new(tables: Vec<TableDescriptor>, style: PrimaryKeyStyle) -> Self {
        Self { tables, style }
    }

    /// Document for a database without user tables
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn style(&self) -> PrimaryKeyStyle {
        self.style
    }

    /// Re-render with a different primary key style
    pub fn with_style(mut self, style: PrimaryKeyStyle) -> Self {
        self.style = style;
        self
    }

    /// One `CREATE TABLE` statement per table
    pub fn statements(&self) -> Vec<String> {
        self.tables
            .iter()
            .map(|t| t.to_create_table(self.style))
            .collect()
    }

    /// The full document, statements separated by a blank line
    pub fn render(&self) -> String {
        self.statements().join(STATEMENT_SEPARATOR)
    }
}

impl fmt::Display for SchemaDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// SQLite keywords, sorted for binary search
const SQLITE_KEYWORDS: [&str; 147] = [
    "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS", "ASC",
    "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE", "CASE", "CAST",
    "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT", "CREATE", "CROSS",
    "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "DATABASE", "DEFAULT",
    "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH", "DISTINCT", "DO", "DROP", "EACH",
    "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE", "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL",
    "FILTER", "FIRST", "FOLLOWING", "FOR", "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB",
    "GROUP", "GROUPS", "HAVING", "IF", "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED",
    "INITIALLY", "INNER", "INSERT", "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN", "KEY",
    "LAST", "LEFT", "LIKE", "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO", "NOT", "NOTHING",
    "NOTNULL", "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS", "OUTER", "OVER",
    "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE", "RANGE", "RECURSIVE",
    "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE", "RESTRICT", "RETURNING",
    "RIGHT", "ROLLBACK", "ROW", "ROWS", "SAVEPOINT", "SELECT", "SET", "TABLE", "TEMP",
    "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION", "TRIGGER", "UNBOUNDED", "UNION", "UNIQUE",
    "UPDATE", "USING", "VACUUM", "VALUES", "VIEW", "VIRTUAL", "WHEN", "WHERE", "WINDOW", "WITH",
    "WITHOUT",
];

fn is_keyword(name: &str) -> bool {
    SQLITE_KEYWORDS
        .binary_search(&name.to_ascii_uppercase().as_str())
        .is_ok()
}

/// Quote an identifier unless it is a plain `[A-Za-z_][A-Za-z0-9_]*` name
/// that is not an SQLite keyword.
pub fn quote_identifier(name: &str) -> Cow<'_, str> {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if plain && !is_keyword(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}
