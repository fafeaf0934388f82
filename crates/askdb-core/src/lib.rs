//! askdb core - shared traits and types
//!
//! This crate provides the abstractions the driver, AI and CLI crates build on:
//!
//! - `Connection` - executing statements and queries against a database
//! - `SchemaIntrospection` - listing tables and columns, producing a schema document
//! - `DatabaseDriver` - creating connections from a `ConnectionConfig`
//! - `SchemaDocument` - `CREATE TABLE` rendering of reflected tables
//! - Common types like `Value`, `Row`, `QueryResult`

mod connection;
pub mod ddl;
mod driver;
mod error;
mod schema;
mod types;

pub use connection::*;
pub use ddl::{ColumnDescriptor, PrimaryKeyStyle, SchemaDocument, TableDescriptor};
pub use driver::*;
pub use error::*;
pub use schema::*;
pub use types::*;
