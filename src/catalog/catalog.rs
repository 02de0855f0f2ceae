// Catalog
//
// Maps table OIDs and names to their heaps and schemas, and table names
// to the indexes maintained on them. Executors resolve everything they
// touch through here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::catalog::schema::Schema;
use crate::index::hash::{HashIndex, IndexError};
use crate::storage::buffer::BufferPoolManager;
use crate::storage::heap::{HeapError, TableHeap};

pub type TableOid = u32;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Table {0} already exists")]
    TableExists(String),

    #[error("Table {0} not found")]
    TableNotFound(String),

    #[error("Heap error: {0}")]
    Heap(#[from] HeapError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

pub struct TableInfo {
    pub name: String,
    pub schema: Schema,
    pub heap: Arc<TableHeap>,
    pub oid: TableOid,
}

pub struct IndexInfo {
    pub name: String,
    pub key_schema: Schema,
    pub key_attrs: Vec<usize>,
    pub index: Arc<HashIndex>,
}

pub struct Catalog {
    buffer_pool: Arc<BufferPoolManager>,
    tables: RwLock<HashMap<TableOid, Arc<TableInfo>>>,
    table_names: RwLock<HashMap<String, TableOid>>,
    indexes: RwLock<HashMap<String, Vec<Arc<IndexInfo>>>>,
    next_oid: AtomicU32,
}

impl Catalog {
    pub fn new(buffer_pool: Arc<BufferPoolManager>) -> Self {
        Self {
            buffer_pool,
            tables: RwLock::new(HashMap::new()),
            table_names: RwLock::new(HashMap::new()),
            indexes: RwLock::new(HashMap::new()),
            next_oid: AtomicU32::new(0),
        }
    }

    /// Create a table with a fresh heap.
    pub fn create_table(
        &self,
        name: impl Into<String>,
        schema: Schema,
    ) -> Result<Arc<TableInfo>, CatalogError> {
        let name = name.into();
        if self.table_names.read().unwrap().contains_key(&name) {
            return Err(CatalogError::TableExists(name));
        }

        let heap = Arc::new(TableHeap::new(self.buffer_pool.clone())?);
        let oid = self.next_oid.fetch_add(1, Ordering::SeqCst);
        let info = Arc::new(TableInfo {
            name: name.clone(),
            schema,
            heap,
            oid,
        });

        self.tables.write().unwrap().insert(oid, info.clone());
        self.table_names.write().unwrap().insert(name, oid);
        Ok(info)
    }

    /// Create a hash index over `key_attrs` of an existing table.
    pub fn create_index(
        &self,
        index_name: impl Into<String>,
        table_name: &str,
        key_attrs: Vec<usize>,
    ) -> Result<Arc<IndexInfo>, CatalogError> {
        let table = self
            .table_by_name(table_name)
            .ok_or_else(|| CatalogError::TableNotFound(table_name.to_string()))?;

        let key_schema = table.schema.project(&key_attrs);
        let info = Arc::new(IndexInfo {
            name: index_name.into(),
            key_schema,
            key_attrs,
            index: Arc::new(HashIndex::new(self.buffer_pool.clone())),
        });

        self.indexes
            .write()
            .unwrap()
            .entry(table_name.to_string())
            .or_default()
            .push(info.clone());
        Ok(info)
    }

    pub fn table(&self, oid: TableOid) -> Option<Arc<TableInfo>> {
        self.tables.read().unwrap().get(&oid).cloned()
    }

    pub fn table_by_name(&self, name: &str) -> Option<Arc<TableInfo>> {
        let oid = *self.table_names.read().unwrap().get(name)?;
        self.table(oid)
    }

    /// All indexes maintained on a table, possibly none.
    pub fn table_indexes(&self, table_name: &str) -> Vec<Arc<IndexInfo>> {
        self.indexes
            .read()
            .unwrap()
            .get(table_name)
            .cloned()
            .unwrap_or_default()
    }
}
