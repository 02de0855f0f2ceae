use std::sync::Arc;
use anyhow::Result;
use tempfile::NamedTempFile;

use rilldb::catalog::Catalog;
use rilldb::query::executor::ExecutorContext;
use rilldb::storage::buffer::BufferPoolManager;
use rilldb::transaction::{IsolationLevel, LockManager, Transaction, TransactionManager};

// Create a buffer pool manager over a temporary database file
#[allow(dead_code)]
pub fn create_test_buffer_pool(pool_size: usize) -> Result<(Arc<BufferPoolManager>, NamedTempFile)> {
    let file = NamedTempFile::new()?;
    let buffer_pool = Arc::new(BufferPoolManager::new(pool_size, file.path())?);
    Ok((buffer_pool, file))
}

// A full storage-and-transaction stack for executor tests
#[allow(dead_code)]
pub struct TestDb {
    pub buffer_pool: Arc<BufferPoolManager>,
    pub catalog: Arc<Catalog>,
    pub txn_manager: Arc<TransactionManager>,
    _file: NamedTempFile,
}

#[allow(dead_code)]
pub fn create_test_db(pool_size: usize) -> Result<TestDb> {
    let (buffer_pool, file) = create_test_buffer_pool(pool_size)?;
    let catalog = Arc::new(Catalog::new(buffer_pool.clone()));
    let txn_manager = Arc::new(TransactionManager::new(Arc::new(LockManager::new())));
    Ok(TestDb {
        buffer_pool,
        catalog,
        txn_manager,
        _file: file,
    })
}

// Begin a transaction and build an executor context around it
#[allow(dead_code)]
pub fn create_test_context(
    db: &TestDb,
    isolation: IsolationLevel,
) -> (Arc<ExecutorContext>, Arc<Transaction>) {
    let txn = db.txn_manager.begin(isolation);
    let ctx = Arc::new(ExecutorContext::new(
        db.buffer_pool.clone(),
        db.catalog.clone(),
        db.txn_manager.lock_manager(),
        txn.clone(),
    ));
    (ctx, txn)
}
