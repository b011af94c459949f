// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Per-backend transaction state.

use std::future::Future;

use tracing::error;

use crate::backend::{BackendError, TxHandle};

/// Holds at most one open transaction for a single backend.
///
/// The slot is the coordinator's unit of transaction lifecycle
/// management: opening is lazy and memoized, and both finalizers clear
/// the slot so that calling them again is a no-op rather than a
/// double-finalize of the underlying transaction.
pub(crate) struct TxSlot<T> {
    backend: &'static str,
    handle: Option<T>,
}

impl<T: TxHandle> TxSlot<T> {
    pub(crate) const fn new(backend: &'static str) -> Self {
        Self {
            backend,
            handle: None,
        }
    }

    pub(crate) const fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Returns the open transaction, beginning one first if the slot is
    /// closed. `begin` is only invoked when a new transaction is needed.
    pub(crate) async fn get_or_begin<F, Fut>(&mut self, begin: F) -> Result<&mut T, BackendError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        if self.handle.is_none() {
            self.handle = Some(begin().await?);
        }

        self.handle.as_mut().ok_or_else(|| {
            BackendError::Unavailable(String::from("transaction handle missing after begin"))
        })
    }

    /// Commits the held transaction, if any.
    ///
    /// The slot is cleared before the backend's result is returned, so
    /// the state is Closed whether the commit succeeded or failed.
    pub(crate) async fn commit(&mut self) -> Result<(), BackendError> {
        match self.handle.take() {
            Some(tx) => tx.commit().await,
            None => Ok(()),
        }
    }

    /// Rolls back the held transaction, if any.
    ///
    /// Never reports an error to the caller: the slot may already be
    /// finalized (a no-op), the backend may report the transaction as
    /// already finalized (swallowed), and anything else is logged at
    /// error severity since the caller already has the primary-path
    /// outcome in hand.
    pub(crate) async fn rollback(&mut self) {
        let Some(tx) = self.handle.take() else {
            return;
        };

        match tx.rollback().await {
            Ok(()) | Err(BackendError::AlreadyFinalized) => {}
            Err(err) => {
                error!(backend = self.backend, %err, "error rolling back transaction");
            }
        }
    }
}
