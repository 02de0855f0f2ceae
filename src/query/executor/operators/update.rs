use std::sync::Arc;

use crate::catalog::{IndexInfo, Schema, TableInfo, Tuple};
use crate::common::types::Rid;
use crate::query::executor::operators::acquire_write_lock;
use crate::query::executor::plans::{UpdateAction, UpdatePlan};
use crate::query::executor::{ExecutionError, ExecutionResult, Executor, ExecutorContext};

/// Update: a sink that rewrites each child row according to the plan's
/// per-column actions, updates the heap in place, and replaces the index
/// entries (new key inserted, old key removed).
pub struct UpdateExecutor {
    ctx: Arc<ExecutorContext>,
    plan: UpdatePlan,
    child: Box<dyn Executor>,
    table: Option<Arc<TableInfo>>,
    indexes: Vec<Arc<IndexInfo>>,
    output_schema: Schema,
    done: bool,
}

impl UpdateExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: UpdatePlan, child: Box<dyn Executor>) -> Self {
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

/// Apply the plan's column rewrites to one row.
fn generate_updated_tuple(
    plan: &UpdatePlan,
    schema: &Schema,
    src: &Tuple,
) -> ExecutionResult<Tuple> {
    let mut values = Vec::with_capacity(schema.column_count());
    for i in 0..schema.column_count() {
        match plan.update_attrs.get(&i) {
            None => values.push(src.value(i).clone()),
            Some(UpdateAction::Set(value)) => values.push(value.clone()),
            Some(UpdateAction::Add(delta)) => {
                let updated = src.value(i).add(delta).ok_or_else(|| {
                    ExecutionError::TypeError(format!(
                        "cannot add {} to column {}",
                        delta,
                        schema.column(i).name()
                    ))
                })?;
                values.push(updated);
            }
        }
    }
    Ok(Tuple::new(values))
}

impl Executor for UpdateExecutor {
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

        while let Some((old_tuple, rid)) = self.child.next()? {
            let new_tuple = generate_updated_tuple(&self.plan, &table.schema, &old_tuple)?;

            acquire_write_lock(&self.ctx, rid)?;
            table.heap.update_tuple(&new_tuple, rid)?;

            for index in &self.indexes {
                let new_key =
                    new_tuple.key_from_tuple(&table.schema, &index.key_schema, &index.key_attrs);
                let old_key =
                    old_tuple.key_from_tuple(&table.schema, &index.key_schema, &index.key_attrs);
                index.index.insert_entry(&new_key, rid)?;
                index.index.delete_entry(&old_key, rid)?;
            }
        }

        self.done = true;
        Ok(None)
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
