mod common;

use std::sync::{Arc, Mutex};

use common::{Event, MockConnection, mock_driver};
use sql_driver::prelude::*;

#[test]
fn execute_outside_transaction_acquires_and_releases() -> Result<(), SqlDriverError> {
    let driver = mock_driver();
    let changed = driver.execute(
        Some(7),
        "INSERT INTO t (a, b) VALUES (?, ?)",
        2,
        Some(&|stmt: &mut dyn SqlPreparedStatement| {
            stmt.bind_long(0, Some(10))?;
            stmt.bind_string(1, Some("ten"))
        }),
    )?;
    assert_eq!(changed, 1);

    assert_eq!(
        driver.provider().events(),
        vec![
            Event::Acquire(1),
            Event::Execute {
                conn: 1,
                sql: "INSERT INTO t (a, b) VALUES (?, ?)".into(),
                bindings: vec![
                    Some(BoundValue::Long(10)),
                    Some(BoundValue::Text("ten".into()))
                ],
            },
            Event::Release(1),
        ]
    );
    Ok(())
}

#[test]
fn execute_failure_still_releases() {
    let driver = mock_driver();
    let err = driver.execute(None, "FAIL insert", 0, None).unwrap_err();
    assert!(matches!(err, SqlDriverError::ExecutionError(_)));
    assert_eq!(
        driver.provider().events(),
        vec![Event::Acquire(1), Event::Release(1)]
    );
}

#[test]
fn prepare_failure_still_releases() {
    let driver = mock_driver();
    assert!(driver.execute(None, "BADPREPARE", 0, None).is_err());
    assert!(driver.execute_query(None, "BADPREPARE", 0, None).is_err());
    assert_eq!(driver.provider().acquired(), 2);
    assert_eq!(driver.provider().outstanding(), 0);
}

#[test]
fn binder_failure_still_releases() {
    let driver = mock_driver();
    let err = driver
        .execute(
            None,
            "INSERT INTO t VALUES (?)",
            1,
            Some(&|stmt: &mut dyn SqlPreparedStatement| stmt.bind_long(3, Some(1))),
        )
        .unwrap_err();
    assert!(matches!(err, SqlDriverError::ParameterError(_)));
    assert_eq!(driver.provider().outstanding(), 0);
}

#[test]
fn typed_nulls_reach_the_statement() -> Result<(), SqlDriverError> {
    let driver = mock_driver();
    driver.execute(
        None,
        "INSERT INTO t VALUES (?, ?, ?, ?)",
        4,
        Some(&|stmt: &mut dyn SqlPreparedStatement| {
            stmt.bind_long(0, None)?;
            stmt.bind_string(1, None)?;
            stmt.bind_bytes(2, None)?;
            stmt.bind_double(3, None)
        }),
    )?;

    let bindings = driver
        .provider()
        .events()
        .into_iter()
        .find_map(|e| match e {
            Event::Execute { bindings, .. } => Some(bindings),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        bindings,
        vec![
            Some(BoundValue::Null(SqlType::Integer)),
            Some(BoundValue::Null(SqlType::Text)),
            Some(BoundValue::Null(SqlType::Blob)),
            Some(BoundValue::Null(SqlType::Real)),
        ]
    );
    Ok(())
}

#[test]
fn cursor_holds_connection_until_closed() -> Result<(), SqlDriverError> {
    let driver = mock_driver();
    let mut cursor = driver.execute_query(None, "SELECT * FROM t", 0, None)?;
    assert_eq!(driver.provider().outstanding(), 1);

    while cursor.advance()? {}
    // Exhausting the rows does not release.
    assert_eq!(driver.provider().outstanding(), 1);

    cursor.close();
    assert!(cursor.is_closed());
    assert_eq!(driver.provider().released(), 1);

    cursor.close();
    drop(cursor);
    assert_eq!(driver.provider().released(), 1);
    Ok(())
}

#[test]
fn dropping_an_open_cursor_releases() -> Result<(), SqlDriverError> {
    let driver = mock_driver();
    {
        let mut cursor = driver.execute_query(None, "SELECT * FROM t", 0, None)?;
        assert!(cursor.advance()?);
    }
    assert_eq!(
        driver.provider().events(),
        vec![
            Event::Acquire(1),
            Event::Query {
                conn: 1,
                sql: "SELECT * FROM t".into()
            },
            Event::Release(1),
        ]
    );
    Ok(())
}

#[test]
fn query_failure_releases_before_returning() {
    let driver = mock_driver();
    let err = driver.execute_query(None, "FAIL select", 0, None).unwrap_err();
    assert!(matches!(err, SqlDriverError::ExecutionError(_)));
    assert_eq!(driver.provider().outstanding(), 0);
}

#[test]
fn cursor_inside_transaction_does_not_release() -> Result<(), SqlDriverError> {
    let driver = mock_driver();
    let tx = driver.new_transaction()?;

    let mut cursor = driver.execute_query(None, "SELECT * FROM t", 0, None)?;
    assert!(cursor.advance()?);
    cursor.close();
    driver.execute(None, "DELETE FROM t", 0, None)?;
    assert_eq!(driver.provider().released(), 0);

    tx.end(true)?;
    assert_eq!(driver.provider().acquired(), 1);
    assert_eq!(driver.provider().released(), 1);

    let conns: Vec<usize> = driver
        .provider()
        .events()
        .iter()
        .filter_map(|e| match e {
            Event::Query { conn, .. } | Event::Execute { conn, .. } => Some(*conn),
            _ => None,
        })
        .collect();
    assert_eq!(conns, vec![1, 1]);
    Ok(())
}

#[test]
fn cursor_reads_typed_columns() -> Result<(), SqlDriverError> {
    let driver = mock_driver();
    let mut cursor = driver.execute_query(None, "SELECT * FROM t", 0, None)?;

    assert_eq!(cursor.column_count(), Some(5));
    assert_eq!(cursor.column_name(1), Some("name"));
    assert_eq!(cursor.column_name(9), None);

    // Before the first advance there is no row to read.
    assert!(matches!(
        cursor.get_long(0),
        Err(SqlDriverError::CursorError(_))
    ));

    assert!(cursor.advance()?);
    assert_eq!(cursor.get_long(0)?, Some(1));
    assert_eq!(cursor.get_string(1)?.as_deref(), Some("alice"));
    assert_eq!(cursor.get_double(2)?, Some(1.5));
    assert_eq!(cursor.get_bytes(3)?, Some(vec![1, 2, 3]));
    assert_eq!(cursor.get_long(4)?, None);
    assert_eq!(cursor.get_string(4)?, None);
    assert_eq!(cursor.column_type(0), Some(ColumnType::Integer));
    assert_eq!(cursor.column_type(4), Some(ColumnType::Null));
    assert!(matches!(
        cursor.get_long(5),
        Err(SqlDriverError::CursorError(_))
    ));

    assert!(cursor.advance()?);
    assert_eq!(cursor.get_string(1)?.as_deref(), Some("bob"));
    assert_eq!(cursor.get_bytes(3)?, Some(Vec::new()));

    assert!(!cursor.advance()?);
    assert!(!cursor.advance()?);

    cursor.close();
    assert!(matches!(
        cursor.advance(),
        Err(SqlDriverError::CursorError(_))
    ));
    assert_eq!(cursor.column_count(), None);
    Ok(())
}

#[test]
fn column_type_is_unknown_off_a_row() -> Result<(), SqlDriverError> {
    let driver = mock_driver();
    let mut cursor = driver.execute_query(None, "SELECT * FROM t", 0, None)?;

    // Names are known up front; types come from the current row's values.
    assert_eq!(cursor.column_name(0), Some("id"));
    assert_eq!(cursor.column_type(0), None);

    assert!(cursor.advance()?);
    assert_eq!(cursor.column_type(2), Some(ColumnType::Real));
    assert_eq!(cursor.column_type(5), None);

    while cursor.advance()? {}
    assert_eq!(cursor.column_type(0), None);

    cursor.close();
    assert_eq!(cursor.column_type(0), None);
    Ok(())
}

#[test]
fn statements_after_transaction_acquire_fresh_connections() -> Result<(), SqlDriverError> {
    let driver = mock_driver();
    driver.transaction(|_| driver.execute(None, "INSERT INTO t VALUES (1)", 0, None))?;
    driver.execute(None, "INSERT INTO t VALUES (2)", 0, None)?;

    assert_eq!(driver.provider().acquired(), 2);
    assert_eq!(driver.provider().outstanding(), 0);
    Ok(())
}

#[test]
fn closure_provider_drives_the_same_protocol() -> Result<(), SqlDriverError> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let released = Arc::new(Mutex::new(Vec::new()));

    let acquire_log = Arc::clone(&log);
    let release_log = Arc::clone(&released);
    let provider = provider_fn(
        move || Ok(MockConnection::standalone(42, Arc::clone(&acquire_log))),
        move |conn: MockConnection| release_log.lock().unwrap().push(conn.id),
    );
    let driver = SqlDriver::new(provider);

    let tx = driver.new_transaction()?;
    driver.execute(None, "INSERT INTO t VALUES (1)", 0, None)?;
    tx.end(true)?;
    driver.execute(None, "INSERT INTO t VALUES (2)", 0, None)?;

    assert_eq!(*released.lock().unwrap(), vec![42, 42]);
    let events = log.lock().unwrap().clone();
    assert_eq!(events.first(), Some(&Event::Begin(42)));
    assert!(events.contains(&Event::Commit(42)));
    Ok(())
}
