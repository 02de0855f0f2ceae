use std::sync::Arc;

use crate::catalog::{IndexInfo, Schema, TableInfo, Tuple};
use crate::common::types::Rid;
use crate::query::executor::operators::acquire_write_lock;
use crate::query::executor::plans::InsertPlan;
use crate::query::executor::{ExecutionError, ExecutionResult, Executor, ExecutorContext};

/// Insert: a sink with two modes. Raw mode inserts the plan's literal
/// rows; pipeline mode drains its child. Every inserted row is locked
/// exclusively and mirrored into every index on the table.
pub struct InsertExecutor {
    ctx: Arc<ExecutorContext>,
    plan: InsertPlan,
    child: Option<Box<dyn Executor>>,
    table: Option<Arc<TableInfo>>,
    indexes: Vec<Arc<IndexInfo>>,
    output_schema: Schema,
    done: bool,
}

impl InsertExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        plan: InsertPlan,
        child: Option<Box<dyn Executor>>,
    ) -> Self {
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

/// Insert one tuple into the heap and every index maintained on the table.
fn insert_with_indexes(
    ctx: &ExecutorContext,
    table: &TableInfo,
    indexes: &[Arc<IndexInfo>],
    tuple: &Tuple,
) -> ExecutionResult<()> {
    let rid = table.heap.insert_tuple(tuple)?;
    acquire_write_lock(ctx, rid)?;

    for index in indexes {
        let key = tuple.key_from_tuple(&table.schema, &index.key_schema, &index.key_attrs);
        index.index.insert_entry(&key, rid)?;
    }
    Ok(())
}

impl Executor for InsertExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        let table = self
            .ctx
            .catalog
            .table(self.plan.table_oid)
            .ok_or(ExecutionError::TableNotFound(self.plan.table_oid))?;
        self.indexes = self.ctx.catalog.table_indexes(&table.name);
        self.table = Some(table);

        if let Some(child) = self.child.as_mut() {
            child.init()?;
        }
        Ok(())
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

        if let Some(rows) = self.plan.raw_values.clone() {
            for values in rows {
                insert_with_indexes(&self.ctx, &table, &self.indexes, &Tuple::new(values))?;
            }
        } else if let Some(child) = self.child.as_mut() {
            while let Some((tuple, _)) = child.next()? {
                insert_with_indexes(&self.ctx, &table, &self.indexes, &tuple)?;
            }
        }

        self.done = true;
        Ok(None)
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
