//! Shared, lock-guarded access to a [`LineStore`].
//!
//! Interactive callers and the conflation sweep may both edit the same
//! collection. Every operation is committed under a short write lock
//! (acquire, mutate, release); change listeners are notified after the lock
//! is released.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::algs::merge_op::{AffectedEntities, ReversibleOperation};
use crate::conflate_error::ConflateError;
use crate::data::store::LineStore;

/// Receives the host's change notifications.
pub trait ChangeListener: Send + Sync {
    /// Called once per committed or reverted operation.
    fn entities_changed(&self, description: &str, changes: &AffectedEntities);
}

/// Cloneable handle to a store shared between threads.
#[derive(Clone, Default)]
pub struct SharedStore {
    inner: Arc<RwLock<LineStore>>,
    listeners: Arc<RwLock<Vec<Arc<dyn ChangeListener>>>>,
}

impl std::fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStore")
            .field("listeners", &self.listeners.read().len())
            .finish_non_exhaustive()
    }
}

impl SharedStore {
    pub fn new(store: LineStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
            listeners: Arc::default(),
        }
    }

    /// Read access; hold it only for the duration of a query.
    pub fn read(&self) -> RwLockReadGuard<'_, LineStore> {
        self.inner.read()
    }

    /// Raw write access for ingestion. Edits made this way are not announced
    /// to listeners.
    pub fn write(&self) -> RwLockWriteGuard<'_, LineStore> {
        self.inner.write()
    }

    pub fn add_listener(&self, listener: Arc<dyn ChangeListener>) {
        self.listeners.write().push(listener);
    }

    /// Execute `op` under the write lock, then notify listeners if it applied.
    pub fn commit<O: ReversibleOperation + ?Sized>(&self, op: &mut O) -> Result<bool, ConflateError> {
        let applied = {
            let mut store = self.inner.write();
            op.execute(&mut store)?
        };
        if applied {
            self.notify(&op.describe(), &op.affected_entities());
        }
        Ok(applied)
    }

    /// Undo `op` under the write lock, then notify listeners.
    pub fn revert<O: ReversibleOperation + ?Sized>(&self, op: &mut O) -> Result<(), ConflateError> {
        {
            let mut store = self.inner.write();
            op.undo(&mut store)?;
        }
        self.notify(&format!("Undo: {}", op.describe()), &op.affected_entities());
        Ok(())
    }

    fn notify(&self, description: &str, changes: &AffectedEntities) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.entities_changed(description, changes);
        }
    }
}
