use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlDriverError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PoolErrorPostgres(#[from] deadpool_postgres::PoolError),

    /// A connection or transaction was not in the state the driver requires.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter binding error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Cursor error: {0}")]
    CursorError(String),
}

impl SqlDriverError {
    /// True for the fatal precondition failure raised by `begin` when a provider hands out a
    /// connection that is not in auto-commit mode.
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }
}

impl From<serde_json::Error> for SqlDriverError {
    fn from(err: serde_json::Error) -> Self {
        SqlDriverError::ConfigError(format!("invalid driver configuration: {err}"))
    }
}
