//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::any::{AnyConnection, AnyProvider};
pub use crate::binder::{Binders, Bindings, SqlPreparedStatement};
pub use crate::config::DriverConfig;
pub use crate::connection::{Connection, ConnectionProvider, Statement, provider_fn};
pub use crate::cursor::SqlCursor;
pub use crate::driver::SqlDriver;
pub use crate::error::SqlDriverError;
pub use crate::results::ResultSet;
pub use crate::transaction::{Transaction, TransactionRef, TransactionState};
pub use crate::types::{BoundValue, ColumnType, DatabaseType, SqlType, SqlValue};

#[cfg(feature = "postgres")]
pub use crate::postgres::{PgConnector, PostgresOptions};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteBeginMode, SqliteConnector, SqliteOptions, SqliteOptionsBuilder};
