//! Atomic unit-of-work boundary.
//!
//! Every write operation of the orchestration layer is a read-modify-write
//! sequence against two independently keyed records (the item and the
//! reservation). The boundary guarantees the sequence commits as one unit:
//! either both records are durably updated, or neither is. Real backends
//! provide this with a database transaction plus row locking or an
//! optimistic version check; the repositories' `ExpectedVersion` guard
//! covers the latter regardless of backend.

use std::sync::{Arc, Mutex};

pub trait TransactionBoundary: Send + Sync {
    /// Run `op` so that its reads and writes take effect atomically.
    fn within<T, F>(&self, op: F) -> T
    where
        F: FnOnce() -> T;
}

/// Serializes units of work behind a single mutex.
///
/// Intended for tests/dev together with the in-memory repositories: full
/// serialization is a (coarse) valid implementation of the atomicity and
/// isolation contract above.
#[derive(Debug, Default)]
pub struct InMemoryTransactionBoundary {
    gate: Mutex<()>,
}

impl InMemoryTransactionBoundary {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionBoundary for InMemoryTransactionBoundary {
    fn within<T, F>(&self, op: F) -> T
    where
        F: FnOnce() -> T,
    {
        let _guard = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        op()
    }
}

impl<B> TransactionBoundary for Arc<B>
where
    B: TransactionBoundary + ?Sized,
{
    fn within<T, F>(&self, op: F) -> T
    where
        F: FnOnce() -> T,
    {
        (**self).within(op)
    }
}
