//! Synchronous SQL driver adapters with thread-scoped transactions.
//!
//! A [`SqlDriver`] runs statements over connections handed out by a [`ConnectionProvider`].
//! Each thread has its own current transaction per driver. Beginning a transaction while one is
//! current nests it on the same connection; only the outermost transaction talks to the
//! database, and its connection goes back to the provider when it ends. Statements outside a
//! transaction borrow a connection for the duration of the call, or until the returned
//! [`SqlCursor`] is closed.
//!
//! Two backends ship behind cargo features:
//!
//! - `sqlite`: [`sqlite::SqliteConnector`], one rusqlite connection per acquire
//! - `postgres`: [`postgres::PgConnector`], a deadpool pool of tokio-postgres clients
//!
//! ```rust,no_run
//! # #[cfg(feature = "sqlite")] {
//! use sql_driver::prelude::*;
//!
//! # fn run() -> Result<(), SqlDriverError> {
//! let provider = DriverConfig::from_json(r#"{"database": "sqlite", "db_path": "app.db"}"#)?
//!     .into_provider()?;
//! let driver = SqlDriver::new(provider);
//!
//! driver.transaction(|_outer| {
//!     driver.execute(Some(1), "INSERT INTO t (id) VALUES (?1)", 1, Some(&|s: &mut dyn SqlPreparedStatement| {
//!         s.bind_long(0, Some(42))
//!     }))?;
//!     // Nested: shares the outer connection, commits with it.
//!     driver.transaction(|_inner| driver.execute(None, "DELETE FROM t WHERE id < 0", 0, None))?;
//!     Ok::<_, SqlDriverError>(())
//! })?;
//! # Ok(()) }
//! # }
//! ```

#[cfg(not(any(feature = "postgres", feature = "sqlite")))]
compile_error!("enable at least one backend feature: `postgres` or `sqlite`");

pub mod any;
pub mod binder;
pub mod config;
pub mod connection;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod prelude;
pub mod results;
pub mod transaction;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use any::{AnyConnection, AnyProvider, AnyStatement};
pub use binder::{Binders, Bindings, SqlPreparedStatement};
pub use config::DriverConfig;
pub use connection::{Connection, ConnectionProvider, FnProvider, Statement, provider_fn};
pub use cursor::SqlCursor;
pub use driver::SqlDriver;
pub use error::SqlDriverError;
pub use results::{ResultSet, SqlRow};
pub use transaction::{Transaction, TransactionRef, TransactionState};
pub use types::{BoundValue, ColumnType, DatabaseType, SqlType, SqlValue};
