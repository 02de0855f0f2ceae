use std::sync::Arc;

use crate::catalog::{Schema, TableInfo, Tuple};
use crate::common::types::Rid;
use crate::query::executor::operators::{acquire_read_lock, release_read_lock};
use crate::query::executor::plans::SeqScanPlan;
use crate::query::executor::{ExecutionError, ExecutionResult, Executor, ExecutorContext};
use crate::storage::heap::TableIterator;

/// Sequential scan: walk the table heap, filter with the plan predicate,
/// and project each surviving row through the output expressions.
pub struct SeqScanExecutor {
    ctx: Arc<ExecutorContext>,
    plan: SeqScanPlan,
    table: Option<Arc<TableInfo>>,
    iter: Option<TableIterator>,
}

impl SeqScanExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: SeqScanPlan) -> Self {
        Self {
            ctx,
            plan,
            table: None,
            iter: None,
        }
    }
}

impl Executor for SeqScanExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        let table = self
            .ctx
            .catalog
            .table(self.plan.table_oid)
            .ok_or(ExecutionError::TableNotFound(self.plan.table_oid))?;
        self.iter = Some(table.heap.iter());
        self.table = Some(table);
        Ok(())
    }

    fn next(&mut self) -> ExecutionResult<Option<(Tuple, Rid)>> {
        if self.iter.is_none() {
            self.init()?;
        }
        let table = match self.table.clone() {
            Some(table) => table,
            None => return Ok(None),
        };

        loop {
            let row = match self.iter.as_mut() {
                Some(iter) => iter.next()?,
                None => return Ok(None),
            };
            let (rid, tuple) = match row {
                Some(row) => row,
                None => return Ok(None),
            };

            let locked = acquire_read_lock(&self.ctx, rid)?;

            let passes = self
                .plan
                .predicate
                .as_ref()
                .map_or(true, |p| p.evaluate(&tuple, &table.schema).is_true());

            if !passes {
                release_read_lock(&self.ctx, rid, locked);
                continue;
            }

            let values = self
                .plan
                .output_exprs
                .iter()
                .map(|e| e.evaluate(&tuple, &table.schema))
                .collect();

            release_read_lock(&self.ctx, rid, locked);
            return Ok(Some((Tuple::new(values), rid)));
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.plan.output_schema
    }
}
