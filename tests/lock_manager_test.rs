use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rilldb::common::types::Rid;
use rilldb::transaction::{
    IsolationLevel, LockManager, Transaction, TransactionManager, TransactionState,
};

fn txn(id: u32, isolation: IsolationLevel) -> Arc<Transaction> {
    Arc::new(Transaction::new(id, isolation))
}

#[test]
fn test_exclusive_waits_for_older_shared_holder() {
    // REPEATABLE_READ: txn 1 holds S; txn 2's X request blocks until the
    // unlock, which also pushes txn 1 into its shrinking phase.
    let lm = Arc::new(LockManager::new());
    let t1 = txn(1, IsolationLevel::RepeatableRead);
    let t2 = txn(2, IsolationLevel::RepeatableRead);
    let rid = Rid::new(1, 0);

    assert!(lm.lock_shared(&t1, rid));

    let acquired = Arc::new(AtomicBool::new(false));
    let waiter = {
        let lm = Arc::clone(&lm);
        let t2 = Arc::clone(&t2);
        let acquired = Arc::clone(&acquired);
        thread::spawn(move || {
            let granted = lm.lock_exclusive(&t2, rid);
            acquired.store(true, Ordering::SeqCst);
            granted
        })
    };

    // Give the waiter time to park; it must not have the lock yet
    thread::sleep(Duration::from_millis(100));
    assert!(!acquired.load(Ordering::SeqCst));

    assert!(lm.unlock(&t1, rid));
    assert!(waiter.join().expect("waiter thread panicked"));
    assert!(t2.is_exclusive_locked(rid));
    assert_eq!(t1.state(), TransactionState::Shrinking);

    // Strict 2PL: a shrinking transaction cannot lock again
    assert!(!lm.lock_shared(&t1, rid));
    assert_eq!(t1.state(), TransactionState::Aborted);
}

#[test]
fn test_wound_wait_older_preempts_younger() {
    // Txn 5 holds X; the older txn 2 requesting X wounds it instead of
    // waiting, and proceeds immediately.
    let lm = LockManager::new();
    let young = txn(5, IsolationLevel::RepeatableRead);
    let old = txn(2, IsolationLevel::RepeatableRead);
    let rid = Rid::new(1, 0);

    assert!(lm.lock_exclusive(&young, rid));
    assert!(lm.lock_exclusive(&old, rid));

    assert_eq!(young.state(), TransactionState::Aborted);
    assert!(!young.is_exclusive_locked(rid));
    assert!(old.is_exclusive_locked(rid));

    // The wounded transaction can no longer lock anything
    assert!(!lm.lock_exclusive(&young, Rid::new(1, 1)));
}

#[test]
fn test_no_mutual_wait_on_crossed_locks() {
    // Classic deadlock shape: each holds what the other wants. Wound-wait
    // resolves it without blocking: the older transaction wounds the
    // younger one and both requests return immediately.
    let lm = LockManager::new();
    let t1 = txn(1, IsolationLevel::RepeatableRead);
    let t2 = txn(2, IsolationLevel::RepeatableRead);
    let rid_a = Rid::new(1, 0);
    let rid_b = Rid::new(1, 1);

    assert!(lm.lock_exclusive(&t1, rid_a));
    assert!(lm.lock_exclusive(&t2, rid_b));

    // The older t1 wounds t2 rather than wait
    assert!(lm.lock_exclusive(&t1, rid_b));
    assert_eq!(t2.state(), TransactionState::Aborted);

    // The wounded t2 fails instead of waiting on t1
    assert!(!lm.lock_exclusive(&t2, rid_a));
}

#[test]
fn test_read_uncommitted_aborts_on_shared_request() {
    let lm = LockManager::new();
    let t1 = txn(1, IsolationLevel::ReadUncommitted);
    let rid = Rid::new(1, 0);

    assert!(!lm.lock_shared(&t1, rid));
    assert_eq!(t1.state(), TransactionState::Aborted);

    // Exclusive locks are still available at this level
    let t2 = txn(2, IsolationLevel::ReadUncommitted);
    assert!(lm.lock_exclusive(&t2, rid));
}

#[test]
fn test_read_committed_relocks_after_release() {
    // READ_COMMITTED releases shared locks eagerly and may re-acquire
    // them later without aborting.
    let lm = LockManager::new();
    let t1 = txn(1, IsolationLevel::ReadCommitted);
    let rid = Rid::new(1, 0);

    assert!(lm.lock_shared(&t1, rid));
    assert!(lm.unlock(&t1, rid));
    // No shrinking-phase transition outside REPEATABLE_READ
    assert_eq!(t1.state(), TransactionState::Growing);
    assert!(lm.lock_shared(&t1, rid));
}

#[test]
fn test_concurrent_upgrade_collision() {
    // Txn 2 parks in an upgrade behind the older shared holder txn 1.
    // While it waits, txn 3's upgrade on the same record must fail fast.
    let lm = Arc::new(LockManager::new());
    let t1 = txn(1, IsolationLevel::RepeatableRead);
    let t2 = txn(2, IsolationLevel::RepeatableRead);
    let t3 = txn(3, IsolationLevel::RepeatableRead);
    let rid = Rid::new(1, 0);

    assert!(lm.lock_shared(&t1, rid));
    assert!(lm.lock_shared(&t2, rid));
    assert!(lm.lock_shared(&t3, rid));

    let upgrader = {
        let lm = Arc::clone(&lm);
        let t2 = Arc::clone(&t2);
        thread::spawn(move || lm.lock_upgrade(&t2, rid))
    };

    thread::sleep(Duration::from_millis(100));

    // Only one upgrade may be in flight per record
    assert!(!lm.lock_upgrade(&t3, rid));

    // Releasing the older holder lets the parked upgrade finish; the
    // younger shared holder t3 is wounded on the way.
    assert!(lm.unlock(&t1, rid));
    assert!(upgrader.join().expect("upgrader thread panicked"));
    assert!(t2.is_exclusive_locked(rid));
    assert!(!t2.is_shared_locked(rid));
    assert_eq!(t3.state(), TransactionState::Aborted);
}

#[test]
fn test_exclusive_serializes_writers() {
    // Many transactions contend for an exclusive lock on one record.
    // Wound-wait guarantees the older transaction always proceeds, so
    // this must finish without deadlock; wounded transactions abort.
    let lm = Arc::new(LockManager::new());
    let tm = Arc::new(TransactionManager::new(Arc::clone(&lm)));
    let counter = Arc::new(std::sync::Mutex::new(0u32));
    let rid = Rid::new(7, 7);

    let mut threads = Vec::new();
    for _ in 0..8 {
        let lm = Arc::clone(&lm);
        let tm = Arc::clone(&tm);
        let counter = Arc::clone(&counter);
        threads.push(thread::spawn(move || {
            for _ in 0..20 {
                let txn = tm.begin(IsolationLevel::RepeatableRead);
                if lm.lock_exclusive(&txn, rid) {
                    {
                        let mut count = counter.lock().unwrap();
                        *count += 1;
                    }
                    tm.commit(&txn).expect("commit failed");
                } else {
                    // Wounded by an older transaction; give up this round
                    tm.abort(&txn).expect("abort failed");
                }
            }
        }));
    }
    for handle in threads {
        handle.join().expect("writer thread panicked");
    }

    let count = *counter.lock().unwrap();
    assert!(count > 0);
    assert!(count <= 160);
}
