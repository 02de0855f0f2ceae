use std::sync::Arc;

use crate::catalog::{IndexInfo, Schema, TableInfo, Tuple};
use crate::common::types::Rid;
use crate::query::executor::operators::acquire_write_lock;
use crate::query::executor::plans::DeletePlan;
use crate::query::executor::{ExecutionError, ExecutionResult, Executor, ExecutorContext};

/// Delete: a sink that pulls victim rows from its child, tombstones them
/// in the heap, and removes their index entries.
pub struct DeleteExecutor {
    ctx: Arc<ExecutorContext>,
    plan: DeletePlan,
    child: Box<dyn Executor>,
    table: Option<Arc<TableInfo>>,
    indexes: Vec<Arc<IndexInfo>>,
    output_schema: Schema,
    done: bool,
}

impl DeleteExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: DeletePlan, child: Box<dyn Executor>) -> Self {
        Self {
            ctx,
            plan,
            child,
            table: None,
            indexes: Vec::new(),
            output_schema: Schema::empty(),
            done: false,
        }
    }
}

impl Executor for DeleteExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        let table = self
            .ctx
            .catalog
            .table(self.plan.table_oid)
            .ok_or(ExecutionError::TableNotFound(self.plan.table_oid))?;
        self.indexes = self.ctx.catalog.table_indexes(&table.name);
        self.table = Some(table);
        self.child.init()
    }

    fn next(&mut self) -> ExecutionResult<Option<(Tuple, Rid)>> {
        if self.done {
            return Ok(None);
        }
        if self.table.is_none() {
            self.init()?;
        }
        let table = match self.table.clone() {
            Some(table) => table,
            None => return Ok(None),
        };

        while let Some((tuple, rid)) = self.child.next()? {
            acquire_write_lock(&self.ctx, rid)?;
            table.heap.mark_delete(rid)?;

            for index in &self.indexes {
                let key = tuple.key_from_tuple(&table.schema, &index.key_schema, &index.key_attrs);
                index.index.delete_entry(&key, rid)?;
            }
        }

        self.done = true;
        Ok(None)
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
