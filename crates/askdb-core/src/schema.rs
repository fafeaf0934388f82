//! Schema introspection traits and types

use crate::{ColumnDescriptor, PrimaryKeyStyle, Result, SchemaDocument, TableDescriptor};
use async_trait::async_trait;

/// Schema introspection interface
#[async_trait]
pub trait SchemaIntrospection: Send + Sync {
    /// List user tables in catalog order, system tables excluded
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Get columns for a table in declaration order
    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// Reflect every user table into a schema document.
    ///
    /// The default builds the document from `list_tables` and `get_columns`;
    /// any failure aborts the whole reflection.
    async fn schema_document(&self, style: PrimaryKeyStyle) -> Result<SchemaDocument> {
        let mut tables = Vec::new();
        for name in self.list_tables().await? {
            let columns = self.get_columns(&name).await?;
            tables.push(TableDescriptor::new(name, columns));
        }
        Ok(SchemaDocument::new(tables, style))
    }
}
