use std::fmt;
use std::sync::Arc;

use crate::binder::SqlPreparedStatement;
use crate::error::SqlDriverError;
use crate::results::ResultSet;

/// A database session as seen by the driver.
///
/// Each backend implements this once; transaction tracking and connection lifetime are handled
/// by [`crate::SqlDriver`] on top of it.
pub trait Connection {
    /// Prepared statement borrowing this connection.
    type Statement<'c>: Statement + 'c
    where
        Self: 'c;

    /// Prepare `sql`. `identifier` asks the client to reuse a cached statement when it can;
    /// `parameters` is the caller's count of positional parameters.
    ///
    /// # Errors
    /// Returns the client's error if the statement cannot be prepared.
    fn prepare(
        &mut self,
        identifier: Option<i32>,
        sql: &str,
        parameters: usize,
    ) -> Result<Self::Statement<'_>, SqlDriverError>;

    /// Whether the connection is in its default implicit-transaction (auto-commit) mode.
    fn is_autocommit(&self) -> bool;

    /// Leave auto-commit mode and open a physical transaction.
    ///
    /// # Errors
    /// Returns the client's error if the transaction cannot be started.
    fn begin(&mut self) -> Result<(), SqlDriverError>;

    /// Commit the physical transaction and return to auto-commit mode.
    ///
    /// # Errors
    /// Returns the client's error if the commit fails.
    fn commit(&mut self) -> Result<(), SqlDriverError>;

    /// Roll back the physical transaction and return to auto-commit mode.
    ///
    /// # Errors
    /// Returns the client's error if the rollback fails.
    fn rollback(&mut self) -> Result<(), SqlDriverError>;
}

/// A prepared, bindable statement that runs exactly once.
pub trait Statement: SqlPreparedStatement + Sized {
    /// Run for side effects, returning the affected row count.
    ///
    /// # Errors
    /// Returns the client's error if execution fails.
    fn execute(self) -> Result<u64, SqlDriverError>;

    /// Run and collect the produced rows.
    ///
    /// # Errors
    /// Returns the client's error if execution or fetching fails.
    fn execute_query(self) -> Result<ResultSet, SqlDriverError>;
}

/// Supplies and reclaims connections. Pooling policy lives entirely behind this trait.
///
/// Connections must be handed out in auto-commit mode; [`crate::SqlDriver::new_transaction`]
/// refuses any other.
pub trait ConnectionProvider {
    type Connection: Connection;

    /// # Errors
    /// Returns `SqlDriverError` if no connection can be supplied.
    fn acquire(&self) -> Result<Self::Connection, SqlDriverError>;

    /// Take back a connection previously returned by `acquire`.
    fn release(&self, connection: Self::Connection);

    /// Shut the provider down. The default does nothing.
    fn close(&self) {}
}

/// Provider assembled from an acquire closure and a release closure.
pub struct FnProvider<C, A, R> {
    acquire: A,
    release: R,
    _connection: std::marker::PhantomData<fn() -> C>,
}

/// Build a [`ConnectionProvider`] from two closures.
///
/// ```rust,no_run
/// # #[cfg(feature = "sqlite")] {
/// use sql_driver::prelude::*;
/// use sql_driver::sqlite::{SqliteConnection, rusqlite};
///
/// let provider = provider_fn(
///     || Ok(SqliteConnection::new(rusqlite::Connection::open("app.db")?)),
///     drop,
/// );
/// let driver = SqlDriver::new(provider);
/// # let _ = driver;
/// # }
/// ```
pub fn provider_fn<C, A, R>(acquire: A, release: R) -> FnProvider<C, A, R>
where
    C: Connection,
    A: Fn() -> Result<C, SqlDriverError>,
    R: Fn(C),
{
    FnProvider {
        acquire,
        release,
        _connection: std::marker::PhantomData,
    }
}

impl<C, A, R> ConnectionProvider for FnProvider<C, A, R>
where
    C: Connection,
    A: Fn() -> Result<C, SqlDriverError>,
    R: Fn(C),
{
    type Connection = C;

    fn acquire(&self) -> Result<C, SqlDriverError> {
        (self.acquire)()
    }

    fn release(&self, connection: C) {
        (self.release)(connection);
    }
}

impl<C, A, R> fmt::Debug for FnProvider<C, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProvider").finish_non_exhaustive()
    }
}

/// A checked-out connection that goes back to its provider exactly once, on drop.
pub(crate) struct Lease<P: ConnectionProvider> {
    provider: Arc<P>,
    connection: Option<P::Connection>,
}

impl<P: ConnectionProvider> Lease<P> {
    pub(crate) fn acquire(provider: &Arc<P>) -> Result<Self, SqlDriverError> {
        let connection = provider.acquire()?;
        tracing::debug!("connection acquired");
        Ok(Self {
            provider: Arc::clone(provider),
            connection: Some(connection),
        })
    }

    pub(crate) fn connection_mut(&mut self) -> Result<&mut P::Connection, SqlDriverError> {
        self.connection.as_mut().ok_or_else(|| {
            SqlDriverError::InvalidState("connection already released".into())
        })
    }
}

impl<P: ConnectionProvider> Drop for Lease<P> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.provider.release(connection);
            tracing::debug!("connection released");
        }
    }
}
