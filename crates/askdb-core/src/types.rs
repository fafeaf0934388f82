//! Query values and result sets

use std::fmt;

/// A single cell value.
///
/// Mirrors SQLite's storage classes; `Bool` exists only for binding
/// parameters and is stored as 0/1.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Float64(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            Value::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// One result row; values are positionally aligned with the result columns
#[derive(Debug, Clone)]
pub struct Row {
    pub values: Vec<Value>,
    columns: Vec<String>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c == name)?;
        self.values.get(index)
    }
}

/// A result column
#[derive(Debug, Clone, Default)]
pub struct ColumnMeta {
    pub name: String,
    /// Declared type, or `DYNAMIC` for computed expressions
    pub data_type: String,
    pub ordinal: usize,
}

/// Rows returned by a query
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Row>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column names in result order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Outcome of a statement that returns no rows
#[derive(Debug, Clone, Default)]
pub struct StatementResult {
    pub affected_rows: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup_by_name() {
        let row = Row::new(
            vec!["id".into(), "name".into()],
            vec![Value::Int64(1), Value::from("Alice")],
        );

        assert_eq!(row.get_by_name("name").and_then(Value::as_str), Some("Alice"));
        assert_eq!(row.get_by_name("missing"), None);
        assert_eq!(row.get(0), Some(&Value::Int64(1)));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Float64(2500.5).to_string(), "2500.5");
        assert_eq!(Value::from("Notebook").to_string(), "Notebook");
        assert_eq!(Value::Bytes(vec![1, 2, 3]).to_string(), "<3 bytes>");
    }
}
