//! SQLite database driver implementation

mod connection;
mod driver;
pub mod schema;

pub use connection::SqliteConnection;
pub use driver::SqliteDriver;
pub use schema::{
    ReflectOptions, ReflectionError, SYSTEM_TABLE_PREFIX, is_system_table, reflect_schema,
    reflect_schema_at, reflect_schema_with,
};
