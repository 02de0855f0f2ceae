// Lock manager
//
// Per-record strict two-phase locking with shared and exclusive modes.
// Deadlock prevention is wound-wait: an older transaction (lower id)
// aborts younger holders instead of waiting, so waits only ever point
// at strictly older transactions and no cycle can form.
//
// One global mutex guards the lock table; each record's request queue
// carries a condition variable keyed to that mutex. A wounded waiter is
// woken by the broadcast on unlock, observes its own Aborted state, and
// gives up.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use log::warn;

use crate::common::types::Rid;
use crate::transaction::concurrency::transaction::{
    IsolationLevel, Transaction, TransactionState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

struct LockRequest {
    txn: Arc<Transaction>,
    mode: LockMode,
    granted: bool,
}

#[derive(Default)]
struct LockRequestQueue {
    requests: VecDeque<LockRequest>,
    cv: Arc<Condvar>,
    /// At most one in-flight upgrade per record
    upgrading: bool,
}

pub struct LockManager {
    latch: Mutex<HashMap<Rid, LockRequestQueue>>,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            latch: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire a shared lock. Returns `false` if the transaction is done,
    /// the isolation level forbids it, or the transaction got wounded
    /// while waiting.
    pub fn lock_shared(&self, txn: &Arc<Transaction>, rid: Rid) -> bool {
        let mut table = self.latch.lock().unwrap();
        loop {
            if matches!(
                txn.state(),
                TransactionState::Aborted | TransactionState::Committed
            ) {
                return false;
            }
            // Dirty reads are the point of READ_UNCOMMITTED; asking for a
            // shared lock is a protocol violation.
            if txn.isolation_level() == IsolationLevel::ReadUncommitted {
                txn.set_state(TransactionState::Aborted);
                return false;
            }
            if txn.isolation_level() == IsolationLevel::RepeatableRead
                && txn.state() == TransactionState::Shrinking
            {
                txn.set_state(TransactionState::Aborted);
                return false;
            }
            if txn.is_shared_locked(rid) {
                return true;
            }

            let queue = table.entry(rid).or_default();
            let mut must_wait = false;
            let mut i = 0;
            while i < queue.requests.len() {
                let other = &queue.requests[i];
                if other.txn.id() > txn.id() && other.mode == LockMode::Exclusive {
                    // Wound the younger exclusive owner
                    warn!(
                        "wound-wait: txn {} wounds txn {} on record {}",
                        txn.id(),
                        other.txn.id(),
                        rid
                    );
                    other.txn.set_state(TransactionState::Aborted);
                    other.txn.remove_exclusive(rid);
                    queue.requests.remove(i);
                    continue;
                } else if other.txn.id() < txn.id() && other.mode == LockMode::Exclusive {
                    // Park behind the older exclusive owner
                    Self::upsert(queue, txn, LockMode::Shared, false);
                    must_wait = true;
                    break;
                } else if other.txn.id() == txn.id() {
                    break;
                }
                i += 1;
            }

            if must_wait {
                let cv = queue.cv.clone();
                table = cv.wait(table).unwrap();
                continue;
            }

            txn.set_state(TransactionState::Growing);
            Self::upsert(queue, txn, LockMode::Shared, true);
            txn.add_shared(rid);
            return true;
        }
    }

    /// Acquire an exclusive lock: wound every younger transaction in the
    /// queue, wait on every older one.
    pub fn lock_exclusive(&self, txn: &Arc<Transaction>, rid: Rid) -> bool {
        let mut table = self.latch.lock().unwrap();
        loop {
            if matches!(
                txn.state(),
                TransactionState::Aborted | TransactionState::Committed
            ) {
                return false;
            }
            if txn.isolation_level() == IsolationLevel::RepeatableRead
                && txn.state() == TransactionState::Shrinking
            {
                txn.set_state(TransactionState::Aborted);
                return false;
            }
            if txn.is_exclusive_locked(rid) {
                return true;
            }

            let queue = table.entry(rid).or_default();
            let mut must_wait = false;
            let mut i = 0;
            while i < queue.requests.len() {
                let other = &queue.requests[i];
                if other.txn.id() > txn.id() {
                    warn!(
                        "wound-wait: txn {} wounds txn {} on record {}",
                        txn.id(),
                        other.txn.id(),
                        rid
                    );
                    other.txn.set_state(TransactionState::Aborted);
                    other.txn.remove_shared(rid);
                    other.txn.remove_exclusive(rid);
                    queue.requests.remove(i);
                    continue;
                } else if other.txn.id() < txn.id() {
                    Self::upsert(queue, txn, LockMode::Exclusive, false);
                    must_wait = true;
                    break;
                } else if other.txn.id() == txn.id() {
                    break;
                }
                i += 1;
            }

            if must_wait {
                let cv = queue.cv.clone();
                table = cv.wait(table).unwrap();
                continue;
            }

            txn.set_state(TransactionState::Growing);
            Self::upsert(queue, txn, LockMode::Exclusive, true);
            txn.add_exclusive(rid);
            return true;
        }
    }

    /// Upgrade a held shared lock to exclusive. Only one upgrade may be in
    /// flight per record; a second concurrent upgrade fails immediately.
    pub fn lock_upgrade(&self, txn: &Arc<Transaction>, rid: Rid) -> bool {
        let mut table = self.latch.lock().unwrap();
        let mut upgrade_claimed = false;
        loop {
            if matches!(
                txn.state(),
                TransactionState::Aborted | TransactionState::Committed
            ) {
                Self::release_upgrade_claim(&mut table, rid, upgrade_claimed);
                return false;
            }
            if txn.isolation_level() == IsolationLevel::RepeatableRead
                && txn.state() == TransactionState::Shrinking
            {
                txn.set_state(TransactionState::Aborted);
                Self::release_upgrade_claim(&mut table, rid, upgrade_claimed);
                return false;
            }
            if txn.is_exclusive_locked(rid) {
                Self::release_upgrade_claim(&mut table, rid, upgrade_claimed);
                return true;
            }

            let queue = table.entry(rid).or_default();
            if queue.upgrading && !upgrade_claimed {
                return false;
            }
            queue.upgrading = true;
            upgrade_claimed = true;

            let mut must_wait = false;
            let mut i = 0;
            while i < queue.requests.len() {
                let other = &queue.requests[i];
                if other.txn.id() > txn.id() {
                    warn!(
                        "wound-wait: txn {} wounds txn {} on record {}",
                        txn.id(),
                        other.txn.id(),
                        rid
                    );
                    other.txn.set_state(TransactionState::Aborted);
                    other.txn.remove_shared(rid);
                    other.txn.remove_exclusive(rid);
                    queue.requests.remove(i);
                    continue;
                } else if other.txn.id() < txn.id() {
                    must_wait = true;
                    break;
                }
                i += 1;
            }

            if must_wait {
                let cv = queue.cv.clone();
                table = cv.wait(table).unwrap();
                continue;
            }

            // Flip this transaction's queue entry to exclusive mode
            Self::upsert(queue, txn, LockMode::Exclusive, true);
            for request in queue.requests.iter_mut() {
                if request.txn.id() == txn.id() {
                    request.mode = LockMode::Exclusive;
                    request.granted = true;
                }
            }
            txn.remove_shared(rid);
            txn.add_exclusive(rid);
            queue.upgrading = false;
            return true;
        }
    }

    /// Release a lock. Under REPEATABLE_READ the first unlock moves the
    /// transaction into its shrinking phase.
    pub fn unlock(&self, txn: &Arc<Transaction>, rid: Rid) -> bool {
        let mut table = self.latch.lock().unwrap();

        if txn.isolation_level() == IsolationLevel::RepeatableRead
            && txn.state() == TransactionState::Growing
        {
            txn.set_state(TransactionState::Shrinking);
        }

        let queue = match table.get_mut(&rid) {
            Some(queue) => queue,
            None => return false,
        };

        if let Some(pos) = queue
            .requests
            .iter()
            .position(|r| r.txn.id() == txn.id())
        {
            queue.requests.remove(pos);
            txn.remove_shared(rid);
            txn.remove_exclusive(rid);
            queue.cv.notify_all();
            true
        } else {
            false
        }
    }

    /// Release every lock a transaction still holds (commit/abort path).
    pub fn release_all(&self, txn: &Arc<Transaction>) {
        for rid in txn.locked_rids() {
            self.unlock(txn, rid);
        }
    }

    /// Insert a request, or merge the granted flag into an existing one.
    fn upsert(
        queue: &mut LockRequestQueue,
        txn: &Arc<Transaction>,
        mode: LockMode,
        granted: bool,
    ) {
        for request in queue.requests.iter_mut() {
            if request.txn.id() == txn.id() {
                request.granted |= granted;
                return;
            }
        }
        queue.requests.push_back(LockRequest {
            txn: txn.clone(),
            mode,
            granted,
        });
    }

    fn release_upgrade_claim(
        table: &mut HashMap<Rid, LockRequestQueue>,
        rid: Rid,
        claimed: bool,
    ) {
        if claimed {
            if let Some(queue) = table.get_mut(&rid) {
                queue.upgrading = false;
            }
        }
    }
}
