use std::sync::Arc;

use crate::catalog::Catalog;
use crate::storage::buffer::BufferPoolManager;
use crate::transaction::{LockManager, Transaction};

/// Everything an operator needs to run: the storage, the catalog, and the
/// transaction it executes on behalf of. Built once per query and shared
/// down the operator tree.
pub struct ExecutorContext {
    pub buffer_pool: Arc<BufferPoolManager>,
    pub catalog: Arc<Catalog>,
    pub lock_manager: Arc<LockManager>,
    pub txn: Arc<Transaction>,
}

impl ExecutorContext {
    pub fn new(
        buffer_pool: Arc<BufferPoolManager>,
        catalog: Arc<Catalog>,
        lock_manager: Arc<LockManager>,
        txn: Arc<Transaction>,
    ) -> Self {
        Self {
            buffer_pool,
            catalog,
            lock_manager,
            txn,
        }
    }
}
