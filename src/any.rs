//! Backend-erased provider, connection and statement.
//!
//! `AnyProvider` lets one `SqlDriver` type serve whichever backend a [`crate::DriverConfig`]
//! selects at runtime.

use std::fmt;

#[cfg(feature = "postgres")]
use crate::postgres::{PgConnection, PgConnector, PgStatement};
#[cfg(feature = "sqlite")]
use crate::sqlite::{SqliteConnection, SqliteConnector, SqliteStatement};

use crate::binder::SqlPreparedStatement;
use crate::connection::{Connection, ConnectionProvider, Statement};
use crate::error::SqlDriverError;
use crate::results::ResultSet;
use crate::types::{BoundValue, DatabaseType};

pub enum AnyProvider {
    #[cfg(feature = "postgres")]
    Postgres(PgConnector),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteConnector),
}

impl AnyProvider {
    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "postgres")]
            AnyProvider::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "sqlite")]
            AnyProvider::Sqlite(_) => DatabaseType::Sqlite,
        }
    }
}

impl fmt::Debug for AnyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(connector) => f.debug_tuple("Postgres").field(connector).finish(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(connector) => f.debug_tuple("Sqlite").field(connector).finish(),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<PgConnector> for AnyProvider {
    fn from(connector: PgConnector) -> Self {
        AnyProvider::Postgres(connector)
    }
}

#[cfg(feature = "sqlite")]
impl From<SqliteConnector> for AnyProvider {
    fn from(connector: SqliteConnector) -> Self {
        AnyProvider::Sqlite(connector)
    }
}

impl ConnectionProvider for AnyProvider {
    type Connection = AnyConnection;

    fn acquire(&self) -> Result<AnyConnection, SqlDriverError> {
        match self {
            #[cfg(feature = "postgres")]
            AnyProvider::Postgres(connector) => connector.acquire().map(AnyConnection::Postgres),
            #[cfg(feature = "sqlite")]
            AnyProvider::Sqlite(connector) => connector.acquire().map(AnyConnection::Sqlite),
        }
    }

    #[allow(unreachable_patterns)]
    fn release(&self, connection: AnyConnection) {
        match (self, connection) {
            #[cfg(feature = "postgres")]
            (AnyProvider::Postgres(connector), AnyConnection::Postgres(conn)) => {
                connector.release(conn);
            }
            #[cfg(feature = "sqlite")]
            (AnyProvider::Sqlite(connector), AnyConnection::Sqlite(conn)) => {
                connector.release(conn);
            }
            (_, conn) => {
                tracing::warn!(connection = ?conn, "connection released to a provider of another backend; dropping it");
            }
        }
    }

    fn close(&self) {
        match self {
            #[cfg(feature = "postgres")]
            AnyProvider::Postgres(connector) => connector.close(),
            #[cfg(feature = "sqlite")]
            AnyProvider::Sqlite(connector) => connector.close(),
        }
    }
}

#[derive(Debug)]
pub enum AnyConnection {
    #[cfg(feature = "postgres")]
    Postgres(PgConnection),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteConnection),
}

impl AnyConnection {
    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "postgres")]
            AnyConnection::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "sqlite")]
            AnyConnection::Sqlite(_) => DatabaseType::Sqlite,
        }
    }
}

impl Connection for AnyConnection {
    type Statement<'c>
        = AnyStatement<'c>
    where
        Self: 'c;

    fn prepare(
        &mut self,
        identifier: Option<i32>,
        sql: &str,
        parameters: usize,
    ) -> Result<AnyStatement<'_>, SqlDriverError> {
        match self {
            #[cfg(feature = "postgres")]
            AnyConnection::Postgres(conn) => conn
                .prepare(identifier, sql, parameters)
                .map(AnyStatement::Postgres),
            #[cfg(feature = "sqlite")]
            AnyConnection::Sqlite(conn) => conn
                .prepare(identifier, sql, parameters)
                .map(AnyStatement::Sqlite),
        }
    }

    fn is_autocommit(&self) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            AnyConnection::Postgres(conn) => conn.is_autocommit(),
            #[cfg(feature = "sqlite")]
            AnyConnection::Sqlite(conn) => conn.is_autocommit(),
        }
    }

    fn begin(&mut self) -> Result<(), SqlDriverError> {
        match self {
            #[cfg(feature = "postgres")]
            AnyConnection::Postgres(conn) => conn.begin(),
            #[cfg(feature = "sqlite")]
            AnyConnection::Sqlite(conn) => conn.begin(),
        }
    }

    fn commit(&mut self) -> Result<(), SqlDriverError> {
        match self {
            #[cfg(feature = "postgres")]
            AnyConnection::Postgres(conn) => conn.commit(),
            #[cfg(feature = "sqlite")]
            AnyConnection::Sqlite(conn) => conn.commit(),
        }
    }

    fn rollback(&mut self) -> Result<(), SqlDriverError> {
        match self {
            #[cfg(feature = "postgres")]
            AnyConnection::Postgres(conn) => conn.rollback(),
            #[cfg(feature = "sqlite")]
            AnyConnection::Sqlite(conn) => conn.rollback(),
        }
    }
}

pub enum AnyStatement<'c> {
    #[cfg(feature = "postgres")]
    Postgres(PgStatement<'c>),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteStatement<'c>),
}

impl SqlPreparedStatement for AnyStatement<'_> {
    fn bind(&mut self, index: usize, value: BoundValue) -> Result<(), SqlDriverError> {
        match self {
            #[cfg(feature = "postgres")]
            AnyStatement::Postgres(stmt) => stmt.bind(index, value),
            #[cfg(feature = "sqlite")]
            AnyStatement::Sqlite(stmt) => stmt.bind(index, value),
        }
    }
}

impl Statement for AnyStatement<'_> {
    fn execute(self) -> Result<u64, SqlDriverError> {
        match self {
            #[cfg(feature = "postgres")]
            AnyStatement::Postgres(stmt) => stmt.execute(),
            #[cfg(feature = "sqlite")]
            AnyStatement::Sqlite(stmt) => stmt.execute(),
        }
    }

    fn execute_query(self) -> Result<ResultSet, SqlDriverError> {
        match self {
            #[cfg(feature = "postgres")]
            AnyStatement::Postgres(stmt) => stmt.execute_query(),
            #[cfg(feature = "sqlite")]
            AnyStatement::Sqlite(stmt) => stmt.execute_query(),
        }
    }
}
