// Postgres backend: a deadpool-postgres pool of tokio-postgres clients, driven synchronously.
//
// - config: options and the pooled connection provider
// - connection: the `Connection` and `Statement` implementations
// - params: encoding bound values for the server's parameter types
// - query: result extraction

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use deadpool_postgres;
pub use tokio_postgres;

pub use config::{PgConnector, PostgresOptions};
pub use connection::{PgConnection, PgStatement};
pub use query::{build_result_set, postgres_extract_value};
