//! Thread-scoped transaction tracking.
//!
//! Each driver owns one slot per thread holding its current transaction. Beginning a
//! transaction while another is current nests it: the nested transaction shares the outer
//! transaction's connection and never touches the database itself. Only the outermost
//! transaction issues the physical `BEGIN`, `COMMIT` or `ROLLBACK`, and only its `end` call
//! hands the connection back to the provider.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::connection::{Connection, ConnectionProvider, Lease};
use crate::error::SqlDriverError;

thread_local! {
    static CURRENT_TRANSACTIONS: RefCell<HashMap<u64, Rc<dyn Any>>> =
        RefCell::new(HashMap::new());
}

static NEXT_SLOT: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a single transaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

/// Key of one driver's entry in the per-thread slot map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotKey(u64);

impl SlotKey {
    fn next() -> Self {
        SlotKey(NEXT_SLOT.fetch_add(1, Ordering::Relaxed))
    }

    fn load<N: Any>(self) -> Option<Rc<N>> {
        CURRENT_TRANSACTIONS
            .try_with(|map| map.borrow().get(&self.0).cloned())
            .ok()
            .flatten()
            .and_then(|node| node.downcast::<N>().ok())
    }

    fn store(self, value: Option<Rc<dyn Any>>) {
        // The displaced record is dropped after the map borrow ends; dropping it may release a
        // connection and run provider code.
        let _displaced = CURRENT_TRANSACTIONS
            .try_with(|map| {
                let mut map = map.borrow_mut();
                match value {
                    Some(node) => map.insert(self.0, node),
                    None => map.remove(&self.0),
                }
            })
            .ok()
            .flatten();
    }
}

/// Connection shared by every transaction of one nest.
pub(crate) struct SharedConnection<P: ConnectionProvider> {
    lease: RefCell<Option<Lease<P>>>,
    nested_rollback: Cell<bool>,
}

impl<P: ConnectionProvider> SharedConnection<P> {
    fn is_released(&self) -> bool {
        self.lease.try_borrow().is_ok_and(|lease| lease.is_none())
    }

    /// Physically finish the nest and give the connection back.
    fn complete(&self, successful: bool) -> Result<(), SqlDriverError> {
        let lease = self
            .lease
            .try_borrow_mut()
            .map_err(|_| {
                SqlDriverError::InvalidState("transaction connection is in use".into())
            })?
            .take();
        let Some(mut lease) = lease else {
            return Err(SqlDriverError::InvalidState(
                "transaction connection was already released".into(),
            ));
        };
        let connection = lease.connection_mut()?;

        if successful {
            if self.nested_rollback.get() {
                tracing::warn!(
                    "committing top-level transaction although a nested transaction ended unsuccessfully"
                );
            }
            if let Err(err) = connection.commit() {
                if let Err(rollback_err) = connection.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback after failed commit also failed");
                }
                return Err(err);
            }
            tracing::debug!("transaction committed");
        } else {
            connection.rollback()?;
            tracing::debug!("transaction rolled back");
        }
        Ok(())
    }
}

/// One begin/end pair. Nested records point at their enclosing record.
pub(crate) struct TxNode<P: ConnectionProvider> {
    depth: usize,
    enclosing: Option<Rc<TxNode<P>>>,
    shared: Rc<SharedConnection<P>>,
    state: Cell<TransactionState>,
}

impl<P: ConnectionProvider> TxNode<P> {
    /// Run `f` on the nest's connection.
    pub(crate) fn with_connection<R>(
        &self,
        f: impl FnOnce(&mut P::Connection) -> Result<R, SqlDriverError>,
    ) -> Result<R, SqlDriverError> {
        let mut guard = self.shared.lease.try_borrow_mut().map_err(|_| {
            SqlDriverError::InvalidState("transaction connection is in use".into())
        })?;
        let lease = guard.as_mut().ok_or_else(|| {
            SqlDriverError::InvalidState(
                "enclosing transaction already ended; its connection was released".into(),
            )
        })?;
        f(lease.connection_mut()?)
    }
}

/// Begins transactions and tracks the current one for the calling thread.
pub(crate) struct TransactionManager<P: ConnectionProvider> {
    provider: Arc<P>,
    key: SlotKey,
}

impl<P: ConnectionProvider + 'static> TransactionManager<P> {
    pub(crate) fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            key: SlotKey::next(),
        }
    }

    pub(crate) fn current_node(&self) -> Option<Rc<TxNode<P>>> {
        self.key.load::<TxNode<P>>()
    }

    pub(crate) fn current(&self) -> Option<TransactionRef<P>> {
        self.current_node().map(|node| TransactionRef { node })
    }

    pub(crate) fn begin(&self) -> Result<Transaction<P>, SqlDriverError> {
        let enclosing = self.current_node();
        let shared = match &enclosing {
            Some(node) => {
                if node.shared.is_released() {
                    return Err(SqlDriverError::InvalidState(
                        "enclosing transaction already ended; cannot nest inside it".into(),
                    ));
                }
                Rc::clone(&node.shared)
            }
            None => {
                let mut lease = Lease::acquire(&self.provider)?;
                let connection = lease.connection_mut()?;
                if !connection.is_autocommit() {
                    return Err(SqlDriverError::InvalidState(
                        "expected connection in auto-commit mode; connection providers must \
                         hand out connections with no open transaction"
                            .into(),
                    ));
                }
                connection.begin()?;
                tracing::debug!("transaction started");
                Rc::new(SharedConnection {
                    lease: RefCell::new(Some(lease)),
                    nested_rollback: Cell::new(false),
                })
            }
        };

        let depth = enclosing.as_ref().map_or(0, |node| node.depth + 1);
        if depth > 0 {
            tracing::debug!(depth, "nested transaction started");
        }
        let node = Rc::new(TxNode {
            depth,
            enclosing,
            shared,
            state: Cell::new(TransactionState::Active),
        });
        self.key.store(Some(Rc::clone(&node) as Rc<dyn Any>));
        Ok(Transaction {
            node,
            key: self.key,
        })
    }
}

impl<P: ConnectionProvider> Drop for TransactionManager<P> {
    fn drop(&mut self) {
        self.key.store(None);
    }
}

/// An open transaction returned by [`crate::SqlDriver::new_transaction`].
///
/// Call [`Transaction::end`] (or `commit` / `rollback`) exactly once. A transaction dropped while
/// still active is ended unsuccessfully.
pub struct Transaction<P: ConnectionProvider + 'static> {
    node: Rc<TxNode<P>>,
    key: SlotKey,
}

impl<P: ConnectionProvider + 'static> Transaction<P> {
    /// End this transaction.
    ///
    /// The outermost transaction commits when `successful` is true and rolls back otherwise,
    /// then releases its connection. A nested transaction only records the outcome. In both
    /// cases the enclosing transaction becomes current again.
    ///
    /// # Errors
    /// Returns the client's error if the physical commit or rollback fails; the connection has
    /// been released and the slot restored either way.
    pub fn end(mut self, successful: bool) -> Result<(), SqlDriverError> {
        self.finish(successful)
    }

    /// Shorthand for `end(true)`.
    ///
    /// # Errors
    /// See [`Transaction::end`].
    pub fn commit(self) -> Result<(), SqlDriverError> {
        self.end(true)
    }

    /// Shorthand for `end(false)`.
    ///
    /// # Errors
    /// See [`Transaction::end`].
    pub fn rollback(self) -> Result<(), SqlDriverError> {
        self.end(false)
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.node.state.get()
    }

    /// 0 for a top-level transaction, 1 for its direct child, and so on.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.node.depth
    }

    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.node.enclosing.is_none()
    }

    #[must_use]
    pub fn enclosing(&self) -> Option<TransactionRef<P>> {
        self.node
            .enclosing
            .as_ref()
            .map(|node| TransactionRef {
                node: Rc::clone(node),
            })
    }

    /// Whether any nested transaction of this nest has ended unsuccessfully so far.
    #[must_use]
    pub fn nested_rollback_requested(&self) -> bool {
        self.node.shared.nested_rollback.get()
    }

    /// A non-owning view of this transaction.
    #[must_use]
    pub fn to_ref(&self) -> TransactionRef<P> {
        TransactionRef {
            node: Rc::clone(&self.node),
        }
    }

    fn finish(&mut self, successful: bool) -> Result<(), SqlDriverError> {
        if self.node.state.get() != TransactionState::Active {
            return Err(SqlDriverError::InvalidState(
                "transaction already ended".into(),
            ));
        }
        self.node.state.set(if successful {
            TransactionState::Committed
        } else {
            TransactionState::RolledBack
        });

        let outcome = if self.node.enclosing.is_none() {
            self.node.shared.complete(successful)
        } else {
            if !successful {
                self.node.shared.nested_rollback.set(true);
            }
            tracing::debug!(depth = self.node.depth, successful, "nested transaction ended");
            Ok(())
        };

        self.restore_enclosing();
        outcome
    }

    fn restore_enclosing(&self) {
        let is_current = self
            .key
            .load::<TxNode<P>>()
            .is_some_and(|current| Rc::ptr_eq(&current, &self.node));
        if !is_current {
            tracing::warn!(
                depth = self.node.depth,
                "ended a transaction that is not the current one"
            );
        }

        let mut next = self.node.enclosing.clone();
        while let Some(node) = next.take() {
            if node.state.get() == TransactionState::Active {
                next = Some(node);
                break;
            }
            next = node.enclosing.clone();
        }
        self.key.store(next.map(|node| node as Rc<dyn Any>));
    }
}

impl<P: ConnectionProvider + 'static> Drop for Transaction<P> {
    fn drop(&mut self) {
        if self.node.state.get() == TransactionState::Active {
            tracing::warn!(
                depth = self.node.depth,
                "transaction dropped without end; rolling back"
            );
            if let Err(err) = self.finish(false) {
                tracing::warn!(error = %err, "rollback of dropped transaction failed");
            }
        }
    }
}

impl<P: ConnectionProvider + 'static> fmt::Debug for Transaction<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("depth", &self.node.depth)
            .field("state", &self.node.state.get())
            .finish_non_exhaustive()
    }
}

/// Read-only handle to a transaction, as returned by
/// [`crate::SqlDriver::current_transaction`]. Dropping it has no effect on the transaction.
pub struct TransactionRef<P: ConnectionProvider> {
    node: Rc<TxNode<P>>,
}

impl<P: ConnectionProvider> TransactionRef<P> {
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.node.state.get()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.node.depth
    }

    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.node.enclosing.is_none()
    }

    #[must_use]
    pub fn enclosing(&self) -> Option<TransactionRef<P>> {
        self.node
            .enclosing
            .as_ref()
            .map(|node| TransactionRef {
                node: Rc::clone(node),
            })
    }
}

impl<P: ConnectionProvider + 'static> TransactionRef<P> {
    /// True when `self` and `transaction` refer to the same begin/end pair.
    #[must_use]
    pub fn is(&self, transaction: &Transaction<P>) -> bool {
        Rc::ptr_eq(&self.node, &transaction.node)
    }
}

impl<P: ConnectionProvider> Clone for TransactionRef<P> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<P: ConnectionProvider> fmt::Debug for TransactionRef<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionRef")
            .field("depth", &self.node.depth)
            .field("state", &self.node.state.get())
            .finish_non_exhaustive()
    }
}
