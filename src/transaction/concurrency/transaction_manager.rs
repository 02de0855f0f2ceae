use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::common::types::TxnId;
use crate::transaction::concurrency::lock_manager::LockManager;
use crate::transaction::concurrency::transaction::{
    IsolationLevel, Transaction, TransactionError, TransactionState,
};

/// Transaction manager - creates and tracks transactions and tears their
/// locks down on commit or abort.
///
/// Transaction IDs increase monotonically from 1; the lock manager's
/// wound-wait policy treats lower IDs as older.
pub struct TransactionManager {
    next_txn_id: AtomicU32,
    lock_manager: Arc<LockManager>,
    active_transactions: Mutex<HashMap<TxnId, Arc<Transaction>>>,
}

impl TransactionManager {
    pub fn new(lock_manager: Arc<LockManager>) -> Self {
        Self {
            next_txn_id: AtomicU32::new(1),
            lock_manager,
            active_transactions: Mutex::new(HashMap::new()),
        }
    }

    pub fn lock_manager(&self) -> Arc<LockManager> {
        self.lock_manager.clone()
    }

    /// Begin a new transaction
    pub fn begin(&self, isolation_level: IsolationLevel) -> Arc<Transaction> {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let txn = Arc::new(Transaction::new(txn_id, isolation_level));
        self.active_transactions
            .lock()
            .unwrap()
            .insert(txn_id, txn.clone());
        txn
    }

    /// Commit a transaction, releasing every lock it still holds.
    pub fn commit(&self, txn: &Arc<Transaction>) -> Result<(), TransactionError> {
        if matches!(
            txn.state(),
            TransactionState::Committed | TransactionState::Aborted
        ) {
            return Err(TransactionError::InvalidState(txn.id()));
        }

        self.lock_manager.release_all(txn);
        txn.set_state(TransactionState::Committed);
        self.active_transactions.lock().unwrap().remove(&txn.id());
        Ok(())
    }

    /// Abort a transaction, releasing every lock it still holds.
    ///
    /// Also the cleanup path for transactions wounded by the lock manager,
    /// which strips only the contested record from their lock sets.
    pub fn abort(&self, txn: &Arc<Transaction>) -> Result<(), TransactionError> {
        if txn.state() == TransactionState::Committed {
            return Err(TransactionError::InvalidState(txn.id()));
        }

        self.lock_manager.release_all(txn);
        txn.set_state(TransactionState::Aborted);
        self.active_transactions.lock().unwrap().remove(&txn.id());
        Ok(())
    }

    pub fn get_transaction(&self, txn_id: TxnId) -> Option<Arc<Transaction>> {
        self.active_transactions.lock().unwrap().get(&txn_id).cloned()
    }

    pub fn active_transaction_ids(&self) -> Vec<TxnId> {
        self.active_transactions.lock().unwrap().keys().copied().collect()
    }
}
