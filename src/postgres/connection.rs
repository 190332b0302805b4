use std::fmt;
use std::future::Future;
use std::sync::Arc;

use deadpool_postgres::Object;
use tokio::runtime::Runtime;
use tokio_postgres::types::ToSql;

use crate::binder::{Bindings, SqlPreparedStatement};
use crate::connection::{Connection, Statement};
use crate::error::SqlDriverError;
use crate::results::ResultSet;
use crate::types::BoundValue;

use super::query::build_result_set;

/// A pooled tokio-postgres client driven synchronously through the owning connector's runtime.
pub struct PgConnection {
    client: Object,
    runtime: Arc<Runtime>,
    in_transaction: bool,
}

impl PgConnection {
    pub(crate) fn new(client: Object, runtime: Arc<Runtime>) -> Self {
        Self {
            client,
            runtime,
            in_transaction: false,
        }
    }

    /// Whether this connection has issued `BEGIN` without a matching `COMMIT` or `ROLLBACK`.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Borrow the pooled client.
    #[must_use]
    pub fn client(&self) -> &Object {
        &self.client
    }

    pub(crate) fn into_client(self) -> Object {
        self.client
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConnection")
            .field("in_transaction", &self.in_transaction)
            .field("closed", &self.client.is_closed())
            .finish_non_exhaustive()
    }
}

impl Connection for PgConnection {
    type Statement<'c>
        = PgStatement<'c>
    where
        Self: 'c;

    fn prepare(
        &mut self,
        identifier: Option<i32>,
        sql: &str,
        parameters: usize,
    ) -> Result<PgStatement<'_>, SqlDriverError> {
        let statement = match identifier {
            Some(_) => self.block_on(self.client.prepare_cached(sql))?,
            None => self.block_on(self.client.prepare(sql))?,
        };
        let declared = statement.params().len();
        if declared != parameters {
            tracing::debug!(declared, parameters, "parameter count differs from statement");
        }
        Ok(PgStatement {
            connection: self,
            bindings: Bindings::with_parameter_count(declared),
            statement,
        })
    }

    fn is_autocommit(&self) -> bool {
        !self.in_transaction
    }

    fn begin(&mut self) -> Result<(), SqlDriverError> {
        self.block_on(self.client.batch_execute("BEGIN"))?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SqlDriverError> {
        self.block_on(self.client.batch_execute("COMMIT"))?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SqlDriverError> {
        self.block_on(self.client.batch_execute("ROLLBACK"))?;
        self.in_transaction = false;
        Ok(())
    }
}

/// Prepared Postgres statement. Values are collected until execution and every declared
/// parameter must be bound.
pub struct PgStatement<'c> {
    connection: &'c PgConnection,
    statement: tokio_postgres::Statement,
    bindings: Bindings,
}

impl PgStatement<'_> {
    fn take_values(&mut self) -> Result<Vec<BoundValue>, SqlDriverError> {
        let parameters = self.statement.params().len();
        std::mem::replace(&mut self.bindings, Bindings::with_parameter_count(parameters))
            .into_values()
    }
}

impl SqlPreparedStatement for PgStatement<'_> {
    fn bind(&mut self, index: usize, value: BoundValue) -> Result<(), SqlDriverError> {
        self.bindings.bind(index, value)
    }
}

impl Statement for PgStatement<'_> {
    fn execute(mut self) -> Result<u64, SqlDriverError> {
        let values = self.take_values()?;
        let params: Vec<&(dyn ToSql + Sync)> =
            values.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
        let changed = self
            .connection
            .block_on(self.connection.client.execute(&self.statement, &params))?;
        Ok(changed)
    }

    fn execute_query(mut self) -> Result<ResultSet, SqlDriverError> {
        let values = self.take_values()?;
        let params: Vec<&(dyn ToSql + Sync)> =
            values.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
        let rows = self
            .connection
            .block_on(self.connection.client.query(&self.statement, &params))?;
        build_result_set(&self.statement, &rows)
    }
}
