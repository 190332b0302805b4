#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sql_driver::prelude::*;

/// Something the mock backend was asked to do, tagged with the connection id.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Acquire(usize),
    Release(usize),
    Begin(usize),
    Commit(usize),
    Rollback(usize),
    Execute {
        conn: usize,
        sql: String,
        bindings: Vec<Option<BoundValue>>,
    },
    Query {
        conn: usize,
        sql: String,
    },
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

fn push(log: &EventLog, event: Event) {
    log.lock().unwrap().push(event);
}

/// In-memory provider that records every call.
///
/// SQL containing `FAIL` errors at execution, SQL containing `BADPREPARE` errors at prepare.
#[derive(Debug, Default)]
pub struct MockProvider {
    log: EventLog,
    next_id: AtomicUsize,
    /// Hand out connections that already have a transaction open.
    pub start_in_transaction: AtomicBool,
    /// Make every physical commit fail.
    pub fail_commit: AtomicBool,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    pub fn acquired(&self) -> usize {
        self.count(|e| matches!(e, Event::Acquire(_)))
    }

    pub fn released(&self) -> usize {
        self.count(|e| matches!(e, Event::Release(_)))
    }

    /// Connections acquired but not yet released.
    pub fn outstanding(&self) -> usize {
        self.acquired() - self.released()
    }
}

impl ConnectionProvider for MockProvider {
    type Connection = MockConnection;

    fn acquire(&self) -> Result<MockConnection, SqlDriverError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        push(&self.log, Event::Acquire(id));
        Ok(MockConnection {
            id,
            log: Arc::clone(&self.log),
            in_transaction: self.start_in_transaction.load(Ordering::SeqCst),
            fail_commit: self.fail_commit.load(Ordering::SeqCst),
        })
    }

    fn release(&self, connection: MockConnection) {
        push(&self.log, Event::Release(connection.id));
    }
}

#[derive(Debug)]
pub struct MockConnection {
    pub id: usize,
    log: EventLog,
    in_transaction: bool,
    fail_commit: bool,
}

impl MockConnection {
    /// A standalone connection that logs into `log`.
    pub fn standalone(id: usize, log: EventLog) -> Self {
        Self {
            id,
            log,
            in_transaction: false,
            fail_commit: false,
        }
    }
}

impl Connection for MockConnection {
    type Statement<'c>
        = MockStatement<'c>
    where
        Self: 'c;

    fn prepare(
        &mut self,
        _identifier: Option<i32>,
        sql: &str,
        parameters: usize,
    ) -> Result<MockStatement<'_>, SqlDriverError> {
        if sql.contains("BADPREPARE") {
            return Err(SqlDriverError::ExecutionError(format!("cannot prepare {sql}")));
        }
        Ok(MockStatement {
            conn: self,
            sql: sql.to_string(),
            bindings: Bindings::with_parameter_count(parameters),
        })
    }

    fn is_autocommit(&self) -> bool {
        !self.in_transaction
    }

    fn begin(&mut self) -> Result<(), SqlDriverError> {
        push(&self.log, Event::Begin(self.id));
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SqlDriverError> {
        push(&self.log, Event::Commit(self.id));
        if self.fail_commit {
            return Err(SqlDriverError::ExecutionError("commit failed".into()));
        }
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SqlDriverError> {
        push(&self.log, Event::Rollback(self.id));
        self.in_transaction = false;
        Ok(())
    }
}

pub struct MockStatement<'c> {
    conn: &'c mut MockConnection,
    sql: String,
    bindings: Bindings,
}

impl SqlPreparedStatement for MockStatement<'_> {
    fn bind(&mut self, index: usize, value: BoundValue) -> Result<(), SqlDriverError> {
        self.bindings.bind(index, value)
    }
}

impl Statement for MockStatement<'_> {
    fn execute(self) -> Result<u64, SqlDriverError> {
        if self.sql.contains("FAIL") {
            return Err(SqlDriverError::ExecutionError(format!("failed: {}", self.sql)));
        }
        push(
            &self.conn.log,
            Event::Execute {
                conn: self.conn.id,
                sql: self.sql,
                bindings: self.bindings.slots().to_vec(),
            },
        );
        Ok(1)
    }

    fn execute_query(self) -> Result<ResultSet, SqlDriverError> {
        if self.sql.contains("FAIL") {
            return Err(SqlDriverError::ExecutionError(format!("failed: {}", self.sql)));
        }
        push(
            &self.conn.log,
            Event::Query {
                conn: self.conn.id,
                sql: self.sql,
            },
        );
        Ok(sample_rows())
    }
}

/// Two rows over columns `id`, `name`, `score`, `data`, `nothing`.
pub fn sample_rows() -> ResultSet {
    ResultSet::from_rows(
        vec![
            "id".into(),
            "name".into(),
            "score".into(),
            "data".into(),
            "nothing".into(),
        ],
        vec![
            vec![
                SqlValue::Integer(1),
                SqlValue::Text("alice".into()),
                SqlValue::Real(1.5),
                SqlValue::Blob(vec![1, 2, 3]),
                SqlValue::Null,
            ],
            vec![
                SqlValue::Integer(2),
                SqlValue::Text("bob".into()),
                SqlValue::Real(2.5),
                SqlValue::Blob(Vec::new()),
                SqlValue::Null,
            ],
        ],
    )
}

pub fn mock_driver() -> SqlDriver<MockProvider> {
    init_tracing();
    SqlDriver::new(MockProvider::new())
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
