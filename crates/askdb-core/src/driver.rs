//! Driver trait and connection configuration

use crate::{AskdbError, Connection, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Core driver trait that all database drivers implement
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "sqlite")
    fn name(&self) -> &'static str;

    /// Display name
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Create a new connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Open a connection, run a trivial query and close it again
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<()>;
}

/// Connection configuration
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfig {
    /// Driver ID (e.g., "sqlite")
    pub driver: String,
    /// Database name or file path
    pub database: Option<String>,
    /// Additional connection parameters
    pub params: HashMap<String, String>,
}

impl ConnectionConfig {
    /// Create a new configuration for the given driver
    pub fn new(driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            ..Default::default()
        }
    }

    /// Create a SQLite configuration
    pub fn new_sqlite(database_path: &str) -> Self {
        let mut config = Self::new("sqlite");
        config.database = Some(database_path.to_string());
        config
    }

    /// Set a connection parameter
    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        let str_val = match value.into() {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        self.params.insert(key.to_string(), str_val);
        self
    }

    /// Get a string parameter
    pub fn get_string(&self, key: &str) -> Option<String> {
        if let Some(val) = self.params.get(key) {
            return Some(val.clone());
        }
        match key {
            "database" | "path" => self.database.clone(),
            _ => None,
        }
    }

    /// Get a boolean parameter ("true"/"1"/"yes")
    pub fn get_bool(&self, key: &str) -> bool {
        self.params
            .get(key)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false)
    }

    /// The database path, or a configuration error naming the driver
    pub fn require_path(&self) -> Result<String> {
        self.get_string("path")
            .or_else(|| self.get_string("database"))
            .ok_or_else(|| {
                AskdbError::Configuration(format!(
                    "{} requires 'path' or 'database' parameter",
                    self.driver
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_config_path_lookup() {
        let config = ConnectionConfig::new_sqlite("/tmp/shop.db");
        assert_eq!(config.get_string("path").as_deref(), Some("/tmp/shop.db"));
        assert_eq!(config.require_path().unwrap(), "/tmp/shop.db");
    }

    #[test]
    fn test_params_override_fields() {
        let config = ConnectionConfig::new_sqlite("a.db")
            .with_param("path", "b.db")
            .with_param("read_only", true);

        assert_eq!(config.require_path().unwrap(), "b.db");
        assert!(config.get_bool("read_only"));
        assert!(!config.get_bool("missing"));
    }

    #[test]
    fn test_missing_path_is_configuration_error() {
        let err = ConnectionConfig::new("sqlite").require_path().unwrap_err();
        assert!(matches!(err, AskdbError::Configuration(_)));
    }
}
