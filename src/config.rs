use serde::Deserialize;

use crate::any::AnyProvider;
use crate::error::SqlDriverError;
use crate::types::DatabaseType;

#[cfg(feature = "postgres")]
use crate::postgres::{PgConnector, PostgresOptions};
#[cfg(feature = "sqlite")]
use crate::sqlite::{SqliteConnector, SqliteOptions};

/// Backend selection plus that backend's options, as read from a configuration file.
///
/// ```rust
/// # #[cfg(feature = "sqlite")] {
/// use sql_driver::prelude::*;
///
/// let config = DriverConfig::from_json(r#"{ "database": "sqlite", "db_path": "app.db", "wal": true }"#)
///     .unwrap();
/// assert_eq!(config.database_type(), DatabaseType::Sqlite);
/// # }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "database", rename_all = "lowercase")]
pub enum DriverConfig {
    #[cfg(feature = "postgres")]
    Postgres(PostgresOptions),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteOptions),
}

impl DriverConfig {
    /// Parse a JSON document.
    ///
    /// # Errors
    /// Returns `SqlDriverError::ConfigError` if the document is malformed or names an unknown
    /// backend.
    pub fn from_json(json: &str) -> Result<Self, SqlDriverError> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "postgres")]
            DriverConfig::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "sqlite")]
            DriverConfig::Sqlite(_) => DatabaseType::Sqlite,
        }
    }

    /// Build the connection provider these options describe.
    ///
    /// # Errors
    /// Returns the backend connector's configuration or connection error.
    pub fn into_provider(self) -> Result<AnyProvider, SqlDriverError> {
        tracing::debug!(database = ?self.database_type(), "building connection provider");
        match self {
            #[cfg(feature = "postgres")]
            DriverConfig::Postgres(opts) => PgConnector::new(opts).map(AnyProvider::Postgres),
            #[cfg(feature = "sqlite")]
            DriverConfig::Sqlite(opts) => SqliteConnector::new(opts).map(AnyProvider::Sqlite),
        }
    }
}
