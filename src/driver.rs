use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::binder::Binders;
use crate::connection::{Connection, ConnectionProvider, Lease, Statement};
use crate::cursor::{OnClose, SqlCursor};
use crate::error::SqlDriverError;
use crate::transaction::{Transaction, TransactionManager, TransactionRef, TxNode};

/// SQL driver over any [`ConnectionProvider`].
///
/// Statements run on the calling thread's current transaction when there is one; otherwise a
/// connection is acquired for the statement and released when it completes (for `execute`) or
/// when the returned cursor closes (for `execute_query`).
///
/// ```rust,no_run
/// # #[cfg(feature = "sqlite")] {
/// use sql_driver::prelude::*;
///
/// # fn demo() -> Result<(), SqlDriverError> {
/// let driver = SqlDriver::new(SqliteOptionsBuilder::new("app.db".into()).build()?);
/// driver.execute(None, "CREATE TABLE t (id INTEGER, name TEXT)", 0, None)?;
///
/// let tx = driver.new_transaction()?;
/// driver.execute(None, "INSERT INTO t (id, name) VALUES (?1, ?2)", 2, Some(&|stmt: &mut dyn SqlPreparedStatement| {
///     stmt.bind_long(0, Some(1))?;
///     stmt.bind_string(1, Some("alice"))
/// }))?;
/// tx.end(true)?;
///
/// let mut cursor = driver.execute_query(None, "SELECT name FROM t", 0, None)?;
/// while cursor.advance()? {
///     println!("{:?}", cursor.get_string(0)?);
/// }
/// cursor.close();
/// # Ok(()) }
/// # }
/// ```
pub struct SqlDriver<P: ConnectionProvider + 'static> {
    provider: Arc<P>,
    transactions: TransactionManager<P>,
}

/// Where a statement gets its connection from.
enum ResolvedConnection<P: ConnectionProvider + 'static> {
    /// Owned by the current transaction; never released here.
    Transaction(Rc<TxNode<P>>),
    /// Acquired for this operation; released when dropped.
    Owned(Lease<P>),
}

impl<P: ConnectionProvider + 'static> ResolvedConnection<P> {
    fn with_connection<R>(
        &mut self,
        f: impl FnOnce(&mut P::Connection) -> Result<R, SqlDriverError>,
    ) -> Result<R, SqlDriverError> {
        match self {
            ResolvedConnection::Transaction(node) => node.with_connection(f),
            ResolvedConnection::Owned(lease) => f(lease.connection_mut()?),
        }
    }

    fn into_on_close(self) -> Option<OnClose> {
        match self {
            ResolvedConnection::Transaction(_) => None,
            ResolvedConnection::Owned(lease) => Some(Box::new(move || drop(lease))),
        }
    }
}

impl<P: ConnectionProvider + 'static> SqlDriver<P> {
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self::from_arc(Arc::new(provider))
    }

    /// Build a driver over a provider that is shared with other owners.
    #[must_use]
    pub fn from_arc(provider: Arc<P>) -> Self {
        let transactions = TransactionManager::new(Arc::clone(&provider));
        Self {
            provider,
            transactions,
        }
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run `sql` for its side effects and return the affected row count.
    ///
    /// `identifier` enables the backend's statement cache; `parameters` is the number of
    /// positional parameters `binders` will fill.
    ///
    /// # Errors
    /// Returns the client's error from prepare, bind or execute. A connection acquired for this
    /// call has been released by the time the error is returned.
    pub fn execute(
        &self,
        identifier: Option<i32>,
        sql: &str,
        parameters: usize,
        binders: Option<Binders<'_>>,
    ) -> Result<u64, SqlDriverError> {
        let mut resolved = self.connection_and_release()?;
        tracing::trace!(sql, parameters, "execute");
        resolved.with_connection(|connection| {
            let mut statement = connection.prepare(identifier, sql, parameters)?;
            if let Some(binders) = binders {
                binders(&mut statement)?;
            }
            statement.execute()
        })
    }

    /// Run `sql` and return a cursor over its rows.
    ///
    /// Outside a transaction the connection stays checked out until the cursor is closed.
    ///
    /// # Errors
    /// Returns the client's error from prepare, bind or execute. A connection acquired for this
    /// call has been released by the time the error is returned.
    pub fn execute_query(
        &self,
        identifier: Option<i32>,
        sql: &str,
        parameters: usize,
        binders: Option<Binders<'_>>,
    ) -> Result<SqlCursor, SqlDriverError> {
        let mut resolved = self.connection_and_release()?;
        tracing::trace!(sql, parameters, "execute_query");
        let rows = resolved.with_connection(|connection| {
            let mut statement = connection.prepare(identifier, sql, parameters)?;
            if let Some(binders) = binders {
                binders(&mut statement)?;
            }
            statement.execute_query()
        })?;
        Ok(SqlCursor::new(rows, resolved.into_on_close()))
    }

    /// Begin a transaction on the calling thread, nesting inside the current one if any.
    ///
    /// # Errors
    /// Returns `SqlDriverError::InvalidState` if the provider hands out a connection that is not
    /// in auto-commit mode, or the client's error if the physical begin fails.
    pub fn new_transaction(&self) -> Result<Transaction<P>, SqlDriverError> {
        self.transactions.begin()
    }

    /// The calling thread's current transaction for this driver.
    #[must_use]
    pub fn current_transaction(&self) -> Option<TransactionRef<P>> {
        self.transactions.current()
    }

    /// Run `f` inside a transaction, committing when it returns `Ok` and rolling back otherwise.
    ///
    /// # Errors
    /// Returns the closure's error, or the driver's error converted into `E` when beginning or
    /// ending the transaction fails.
    pub fn transaction<R, E, F>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&Transaction<P>) -> Result<R, E>,
        E: From<SqlDriverError>,
    {
        let tx = self.new_transaction()?;
        let result = f(&tx);
        tx.end(result.is_ok())?;
        result
    }

    /// Shut down the underlying provider.
    pub fn close(&self) {
        self.provider.close();
    }

    fn connection_and_release(&self) -> Result<ResolvedConnection<P>, SqlDriverError> {
        match self.transactions.current_node() {
            Some(node) => Ok(ResolvedConnection::Transaction(node)),
            None => Ok(ResolvedConnection::Owned(Lease::acquire(&self.provider)?)),
        }
    }
}

impl<P: ConnectionProvider + fmt::Debug + 'static> fmt::Debug for SqlDriver<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlDriver")
            .field("provider", &self.provider)
            .field("in_transaction", &self.current_transaction().is_some())
            .finish()
    }
}
