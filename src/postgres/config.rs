use std::fmt;
use std::sync::Arc;

use deadpool_postgres::{Config as PgConfig, Pool, Runtime as PoolRuntime};
use serde::Deserialize;
use tokio::runtime::{Builder, Runtime};
use tokio_postgres::NoTls;

use crate::connection::ConnectionProvider;
use crate::error::SqlDriverError;

use super::connection::PgConnection;

/// Options for the Postgres connection pool.
///
/// The pool settings are deadpool's own configuration, flattened so a JSON document can carry
/// `host`, `dbname`, `url` and friends at the top level.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgresOptions {
    #[serde(flatten)]
    pub pool: PgConfig,
    /// Worker threads for the runtime that drives the client. Defaults to tokio's choice.
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl PostgresOptions {
    #[must_use]
    pub fn new(pool: PgConfig) -> Self {
        Self {
            pool,
            worker_threads: None,
        }
    }

    /// Options that connect through a `postgres://` URL.
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        let mut pool = PgConfig::new();
        pool.url = Some(url.into());
        Self::new(pool)
    }

    #[must_use]
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = Some(worker_threads);
        self
    }

    fn validate(&self) -> Result<(), SqlDriverError> {
        if self.worker_threads == Some(0) {
            return Err(SqlDriverError::ConfigError(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.pool.url.is_some() {
            return Ok(());
        }
        if self.pool.dbname.is_none() {
            return Err(SqlDriverError::ConfigError(
                "dbname is required".to_string(),
            ));
        }
        if self.pool.host.is_none() && self.pool.hosts.is_none() {
            return Err(SqlDriverError::ConfigError(
                "host is required".to_string(),
            ));
        }
        if self.pool.user.is_none() {
            return Err(SqlDriverError::ConfigError(
                "user is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connection provider backed by a deadpool-postgres pool.
///
/// The connector owns a multi-threaded tokio runtime. Client futures are driven to completion
/// with `block_on`, so the connector must be used from synchronous code and not from inside
/// another tokio runtime.
pub struct PgConnector {
    pool: Pool,
    runtime: Arc<Runtime>,
}

impl PgConnector {
    /// Validate `opts`, start the runtime and create the pool. No connection is opened yet.
    ///
    /// # Errors
    /// Returns `SqlDriverError::ConfigError` if required fields are missing, or
    /// `SqlDriverError::ConnectionError` if the runtime or pool cannot be created.
    pub fn new(opts: PostgresOptions) -> Result<Self, SqlDriverError> {
        opts.validate()?;

        let mut builder = Builder::new_multi_thread();
        if let Some(threads) = opts.worker_threads {
            builder.worker_threads(threads);
        }
        let runtime = builder
            .enable_all()
            .thread_name("sql-driver-pg")
            .build()
            .map_err(|e| {
                SqlDriverError::ConnectionError(format!("Failed to start Postgres runtime: {e}"))
            })?;

        let pool = {
            let _guard = runtime.enter();
            opts.pool
                .create_pool(Some(PoolRuntime::Tokio1), NoTls)
                .map_err(|e| {
                    SqlDriverError::ConnectionError(format!(
                        "Failed to create Postgres pool: {e}"
                    ))
                })?
        };

        Ok(Self {
            pool,
            runtime: Arc::new(runtime),
        })
    }

    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

impl fmt::Debug for PgConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PgConnector")
            .field("max_size", &status.max_size)
            .field("size", &status.size)
            .field("available", &status.available)
            .finish_non_exhaustive()
    }
}

impl ConnectionProvider for PgConnector {
    type Connection = PgConnection;

    fn acquire(&self) -> Result<PgConnection, SqlDriverError> {
        let client = self.runtime.block_on(self.pool.get())?;
        Ok(PgConnection::new(client, Arc::clone(&self.runtime)))
    }

    fn release(&self, connection: PgConnection) {
        if connection.in_transaction() {
            // A session with an open transaction never goes back to the pool.
            tracing::warn!("releasing a Postgres connection with an open transaction; detaching it from the pool");
            drop(deadpool_postgres::Object::take(connection.into_client()));
        } else {
            drop(connection);
        }
    }

    fn close(&self) {
        self.pool.close();
        tracing::debug!("postgres pool closed");
    }
}
