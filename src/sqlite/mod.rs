// SQLite backend over rusqlite.
//
// - config: options, builder and the per-acquire connector (the connection provider)
// - connection: the `Connection` and `Statement` implementations
// - params: bound values to rusqlite values
// - query: result materialisation

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use rusqlite;

pub use config::{SqliteBeginMode, SqliteConnector, SqliteOptions, SqliteOptionsBuilder};
pub use connection::{SqliteConnection, SqliteStatement};
pub use params::bound_value_to_sqlite_value;
pub use query::{build_result_set, sqlite_extract_value};
