// Transaction state
//
// A transaction is shared as Arc<Transaction> between its owning thread
// and the lock manager, which must be able to wound it from another
// thread. State and lock sets therefore live behind interior mutability.

use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;

use crate::common::types::{Rid, TxnId};

/// Transaction isolation levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
}

/// Transaction states under two-phase locking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Growing,
    Shrinking,
    Committed,
    Aborted,
}

#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction {0} is already committed or aborted")]
    InvalidState(TxnId),

    #[error("Transaction {0} not found")]
    NotFound(TxnId),
}

pub struct Transaction {
    id: TxnId,
    isolation_level: IsolationLevel,
    state: Mutex<TransactionState>,
    shared_lock_set: Mutex<HashSet<Rid>>,
    exclusive_lock_set: Mutex<HashSet<Rid>>,
}

impl Transaction {
    pub fn new(id: TxnId, isolation_level: IsolationLevel) -> Self {
        Self {
            id,
            isolation_level,
            state: Mutex::new(TransactionState::Growing),
            shared_lock_set: Mutex::new(HashSet::new()),
            exclusive_lock_set: Mutex::new(HashSet::new()),
        }
    }

    pub fn id(&self) -> TxnId {
        self.id
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    pub fn state(&self) -> TransactionState {
        *self.state.lock().unwrap()
    }

    pub fn set_state(&self, state: TransactionState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn is_shared_locked(&self, rid: Rid) -> bool {
        self.shared_lock_set.lock().unwrap().contains(&rid)
    }

    pub fn is_exclusive_locked(&self, rid: Rid) -> bool {
        self.exclusive_lock_set.lock().unwrap().contains(&rid)
    }

    /// Snapshot of every RID this transaction still holds a lock on.
    pub fn locked_rids(&self) -> Vec<Rid> {
        let shared = self.shared_lock_set.lock().unwrap();
        let exclusive = self.exclusive_lock_set.lock().unwrap();
        shared.iter().chain(exclusive.iter()).copied().collect()
    }

    pub(crate) fn add_shared(&self, rid: Rid) {
        self.shared_lock_set.lock().unwrap().insert(rid);
    }

    pub(crate) fn remove_shared(&self, rid: Rid) {
        self.shared_lock_set.lock().unwrap().remove(&rid);
    }

    pub(crate) fn add_exclusive(&self, rid: Rid) {
        self.exclusive_lock_set.lock().unwrap().insert(rid);
    }

    pub(crate) fn remove_exclusive(&self, rid: Rid) {
        self.exclusive_lock_set.lock().unwrap().remove(&rid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction_is_growing() {
        let txn = Transaction::new(1, IsolationLevel::RepeatableRead);
        assert_eq!(txn.id(), 1);
        assert_eq!(txn.state(), TransactionState::Growing);
        assert_eq!(txn.isolation_level(), IsolationLevel::RepeatableRead);
        assert!(txn.locked_rids().is_empty());
    }

    #[test]
    fn test_lock_set_bookkeeping() {
        let txn = Transaction::new(1, IsolationLevel::RepeatableRead);
        let rid = Rid::new(1, 0);

        txn.add_shared(rid);
        assert!(txn.is_shared_locked(rid));
        assert!(!txn.is_exclusive_locked(rid));

        txn.add_exclusive(rid);
        txn.remove_shared(rid);
        assert!(txn.is_exclusive_locked(rid));
        assert_eq!(txn.locked_rids(), vec![rid]);

        txn.remove_exclusive(rid);
        assert!(txn.locked_rids().is_empty());
    }
}
