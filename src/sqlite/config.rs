use std::time::Duration;

use rusqlite::OpenFlags;
use serde::{Deserialize, Serialize};

use crate::connection::ConnectionProvider;
use crate::error::SqlDriverError;

use super::connection::SqliteConnection;

const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 16;

fn default_statement_cache_capacity() -> usize {
    DEFAULT_STATEMENT_CACHE_CAPACITY
}

/// Locking behaviour of the `BEGIN` issued for a top-level transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqliteBeginMode {
    #[default]
    Deferred,
    Immediate,
    Exclusive,
}

impl SqliteBeginMode {
    pub(crate) fn begin_sql(self) -> &'static str {
        match self {
            SqliteBeginMode::Deferred => "BEGIN DEFERRED",
            SqliteBeginMode::Immediate => "BEGIN IMMEDIATE",
            SqliteBeginMode::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// Options for opening `SQLite` connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteOptions {
    pub db_path: String,
    /// Switch the database to write-ahead logging when a connection opens.
    #[serde(default)]
    pub wal: bool,
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
    #[serde(default)]
    pub read_only: bool,
    /// Capacity of each connection's prepared-statement cache (used for identified statements).
    #[serde(default = "default_statement_cache_capacity")]
    pub statement_cache_capacity: usize,
    #[serde(default)]
    pub begin_mode: SqliteBeginMode,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            wal: false,
            busy_timeout_ms: None,
            read_only: false,
            statement_cache_capacity: DEFAULT_STATEMENT_CACHE_CAPACITY,
            begin_mode: SqliteBeginMode::Deferred,
        }
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.opts.read_only = read_only;
        self
    }

    #[must_use]
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.opts.statement_cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn begin_mode(mut self, mode: SqliteBeginMode) -> Self {
        self.opts.begin_mode = mode;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build a connector for these options.
    ///
    /// # Errors
    ///
    /// Returns `SqlDriverError` if the options are invalid or the initial smoke test fails.
    pub fn build(self) -> Result<SqliteConnector, SqlDriverError> {
        SqliteConnector::new(self.finish())
    }
}

/// Connection provider that opens a fresh `SQLite` connection per acquire and closes it on
/// release.
///
/// Statements prepared with an identifier go through the connection's statement cache, which
/// is dropped with the connection. Reuse therefore only happens while one connection stays
/// leased, i.e. inside a transaction; separate calls outside a transaction prepare afresh.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    opts: SqliteOptions,
}

impl SqliteConnector {
    /// Validate `opts` and open one connection as a smoke test.
    ///
    /// # Errors
    /// Returns `SqlDriverError::ConfigError` for an empty path, or the client's error if the
    /// database cannot be opened.
    pub fn new(opts: SqliteOptions) -> Result<Self, SqlDriverError> {
        if opts.db_path.trim().is_empty() {
            return Err(SqlDriverError::ConfigError(
                "db_path is required".to_string(),
            ));
        }
        let connector = Self { opts };
        connector.open()?;
        Ok(connector)
    }

    #[must_use]
    pub fn options(&self) -> &SqliteOptions {
        &self.opts
    }

    /// Open a connection configured from the options.
    ///
    /// # Errors
    /// Returns `SqlDriverError::SqliteError` if opening or configuring the connection fails.
    pub fn open(&self) -> Result<SqliteConnection, SqlDriverError> {
        let flags = if self.opts.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };
        let conn = rusqlite::Connection::open_with_flags(&self.opts.db_path, flags)?;
        if let Some(ms) = self.opts.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))?;
        }
        if self.opts.wal && !self.opts.read_only {
            apply_wal_pragmas(&conn)?;
        }
        conn.set_prepared_statement_cache_capacity(self.opts.statement_cache_capacity);
        Ok(SqliteConnection::with_begin_mode(conn, self.opts.begin_mode))
    }
}

impl ConnectionProvider for SqliteConnector {
    type Connection = SqliteConnection;

    fn acquire(&self) -> Result<SqliteConnection, SqlDriverError> {
        self.open()
    }

    fn release(&self, connection: SqliteConnection) {
        if let Err((_, err)) = connection.into_inner().close() {
            tracing::warn!(error = %err, "closing sqlite connection failed");
        }
    }
}

/// Switch the database to write-ahead logging.
///
/// # Errors
/// Returns `SqlDriverError` if the PRAGMA cannot be executed.
pub fn apply_wal_pragmas(conn: &rusqlite::Connection) -> Result<(), SqlDriverError> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    tracing::debug!(journal_mode = %mode, "sqlite journal mode set");
    Ok(())
}
