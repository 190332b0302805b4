use std::fmt;

use crate::binder::SqlPreparedStatement;
use crate::connection::{Connection, Statement};
use crate::error::SqlDriverError;
use crate::results::ResultSet;
use crate::types::BoundValue;

use super::config::SqliteBeginMode;
use super::params::bound_value_to_sqlite_value;
use super::query::build_result_set;

/// A rusqlite connection driven through the [`Connection`] capability.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    begin_mode: SqliteBeginMode,
}

impl SqliteConnection {
    #[must_use]
    pub fn new(conn: rusqlite::Connection) -> Self {
        Self::with_begin_mode(conn, SqliteBeginMode::default())
    }

    #[must_use]
    pub fn with_begin_mode(conn: rusqlite::Connection, begin_mode: SqliteBeginMode) -> Self {
        Self { conn, begin_mode }
    }

    /// Borrow the raw rusqlite connection.
    #[must_use]
    pub fn raw(&self) -> &rusqlite::Connection {
        &self.conn
    }

    #[must_use]
    pub fn into_inner(self) -> rusqlite::Connection {
        self.conn
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.conn.path())
            .field("autocommit", &self.conn.is_autocommit())
            .field("begin_mode", &self.begin_mode)
            .finish()
    }
}

impl Connection for SqliteConnection {
    type Statement<'c>
        = SqliteStatement<'c>
    where
        Self: 'c;

    fn prepare(
        &mut self,
        identifier: Option<i32>,
        sql: &str,
        parameters: usize,
    ) -> Result<SqliteStatement<'_>, SqlDriverError> {
        let conn = &self.conn;
        // Per-connection cache; see `SqliteConnector` for its lifetime.
        let handle = match identifier {
            Some(_) => StatementHandle::Cached(conn.prepare_cached(sql)?),
            None => StatementHandle::Fresh(conn.prepare(sql)?),
        };
        let mut statement = SqliteStatement { conn, handle };
        let declared = statement.handle.get_mut().parameter_count();
        if declared != parameters {
            tracing::debug!(declared, parameters, "parameter count differs from statement");
        }
        Ok(statement)
    }

    fn is_autocommit(&self) -> bool {
        self.conn.is_autocommit()
    }

    fn begin(&mut self) -> Result<(), SqlDriverError> {
        self.conn.execute_batch(self.begin_mode.begin_sql())?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SqlDriverError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SqlDriverError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

enum StatementHandle<'c> {
    Fresh(rusqlite::Statement<'c>),
    Cached(rusqlite::CachedStatement<'c>),
}

impl<'c> StatementHandle<'c> {
    fn get_mut(&mut self) -> &mut rusqlite::Statement<'c> {
        match self {
            StatementHandle::Fresh(stmt) => stmt,
            StatementHandle::Cached(stmt) => &mut **stmt,
        }
    }
}

/// Prepared `SQLite` statement. Parameters bind straight into the native statement; parameters
/// left unbound are NULL.
pub struct SqliteStatement<'c> {
    conn: &'c rusqlite::Connection,
    handle: StatementHandle<'c>,
}

impl SqlPreparedStatement for SqliteStatement<'_> {
    fn bind(&mut self, index: usize, value: BoundValue) -> Result<(), SqlDriverError> {
        let stmt = self.handle.get_mut();
        let count = stmt.parameter_count();
        if index >= count {
            return Err(SqlDriverError::ParameterError(format!(
                "parameter index {index} out of range for {count} parameter(s)"
            )));
        }
        stmt.raw_bind_parameter(index + 1, bound_value_to_sqlite_value(value))?;
        Ok(())
    }
}

impl Statement for SqliteStatement<'_> {
    /// Run the statement to completion, discarding any rows it yields (`RETURNING`, pragmas),
    /// and report the rows it changed.
    fn execute(mut self) -> Result<u64, SqlDriverError> {
        {
            let mut rows = self.handle.get_mut().raw_query();
            while rows.next()?.is_some() {}
        }
        Ok(self.conn.changes())
    }

    fn execute_query(mut self) -> Result<ResultSet, SqlDriverError> {
        build_result_set(self.handle.get_mut())
    }
}
