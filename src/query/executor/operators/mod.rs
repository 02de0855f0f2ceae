// Physical operators
//
// One module per operator. DML operators lock records through the
// executor context; the helpers here encode the per-isolation-level
// locking rules they share.

mod aggregation;
mod delete;
mod distinct;
mod hash_join;
mod insert;
mod limit;
mod nested_loop_join;
mod seq_scan;
mod update;

pub use aggregation::AggregationExecutor;
pub use delete::DeleteExecutor;
pub use distinct::DistinctExecutor;
pub use hash_join::HashJoinExecutor;
pub use insert::InsertExecutor;
pub use limit::LimitExecutor;
pub use nested_loop_join::NestedLoopJoinExecutor;
pub use seq_scan::SeqScanExecutor;
pub use update::UpdateExecutor;

use crate::common::types::Rid;
use crate::query::executor::{ExecutionError, ExecutionResult, ExecutorContext};
use crate::transaction::IsolationLevel;

/// Take a shared lock on a record for reading. Returns whether a lock was
/// newly acquired here, so READ_COMMITTED callers can release it after use.
/// READ_UNCOMMITTED never locks; a lock the transaction already holds is
/// left alone.
pub(crate) fn acquire_read_lock(ctx: &ExecutorContext, rid: Rid) -> ExecutionResult<bool> {
    if ctx.txn.isolation_level() == IsolationLevel::ReadUncommitted {
        return Ok(false);
    }
    if ctx.txn.is_shared_locked(rid) || ctx.txn.is_exclusive_locked(rid) {
        return Ok(false);
    }
    if !ctx.lock_manager.lock_shared(&ctx.txn, rid) {
        return Err(ExecutionError::LockDenied(rid));
    }
    Ok(true)
}

/// Counterpart of `acquire_read_lock`: under READ_COMMITTED a lock taken
/// for one read is released as soon as the read is done.
pub(crate) fn release_read_lock(ctx: &ExecutorContext, rid: Rid, acquired: bool) {
    if acquired && ctx.txn.isolation_level() == IsolationLevel::ReadCommitted {
        ctx.lock_manager.unlock(&ctx.txn, rid);
    }
}

/// Take an exclusive lock on a record for writing, upgrading a held
/// shared lock.
pub(crate) fn acquire_write_lock(ctx: &ExecutorContext, rid: Rid) -> ExecutionResult<()> {
    if ctx.txn.is_exclusive_locked(rid) {
        return Ok(());
    }
    let granted = if ctx.txn.is_shared_locked(rid) {
        ctx.lock_manager.lock_upgrade(&ctx.txn, rid)
    } else {
        ctx.lock_manager.lock_exclusive(&ctx.txn, rid)
    };
    if granted {
        Ok(())
    } else {
        Err(ExecutionError::LockDenied(rid))
    }
}
