use futures::future::BoxFuture;
use tracing::warn;

use crate::error::{GraphError, Result};
use crate::store::{GraphStore, GraphTxn};

/// Runs units of work inside a single transaction: commit on `Ok`, rollback on `Err`.
pub struct TransactionRunner<S> {
    store: S,
}

impl<S: GraphStore> TransactionRunner<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Open a transaction, hand it to `work`, and settle it according to the result.
    ///
    /// The transaction is released on every exit path. If the returned future is dropped
    /// before settling, the open transaction is rolled back on the current runtime.
    pub async fn with_transaction<T, F>(&self, work: F) -> Result<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut S::Txn) -> BoxFuture<'t, Result<T>> + Send,
    {
        let mut guard = TxnGuard::new(self.store.begin().await?);

        let outcome = match guard.txn_mut() {
            Ok(txn) => work(txn).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(value) => {
                guard.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = guard.rollback().await {
                    warn!(error = %rollback_err, cause = %e, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

/// Owns an open transaction until it is explicitly settled.
struct TxnGuard<T: GraphTxn> {
    txn: Option<T>,
}

impl<T: GraphTxn> TxnGuard<T> {
    fn new(txn: T) -> Self {
        Self { txn: Some(txn) }
    }

    fn txn_mut(&mut self) -> Result<&mut T> {
        self.txn
            .as_mut()
            .ok_or_else(|| GraphError::Storage("transaction already settled".to_string()))
    }

    async fn commit(mut self) -> Result<()> {
        match self.txn.take() {
            Some(txn) => txn.commit().await,
            None => Ok(()),
        }
    }

    async fn rollback(mut self) -> Result<()> {
        match self.txn.take() {
            Some(txn) => txn.rollback().await,
            None => Ok(()),
        }
    }
}

impl<T: GraphTxn> Drop for TxnGuard<T> {
    fn drop(&mut self) {
        let Some(txn) = self.txn.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = txn.rollback().await {
                        warn!(error = %e, "Rollback of abandoned transaction failed");
                    }
                });
            }
            Err(_) => warn!("Transaction abandoned outside a runtime; connection dropped unsettled"),
        }
    }
}
