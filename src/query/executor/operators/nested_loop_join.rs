use crate::catalog::{Schema, Tuple};
use crate::common::types::Rid;
use crate::query::executor::plans::NestedLoopJoinPlan;
use crate::query::executor::{ExecutionResult, Executor};

/// Nested-loop join: for each outer (left) row, scan the inner (right)
/// child completely, re-initializing it when exhausted. The current outer
/// row persists across `next` calls so every match is emitted.
pub struct NestedLoopJoinExecutor {
    plan: NestedLoopJoinPlan,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    current_left: Option<Tuple>,
    initialized: bool,
}

impl NestedLoopJoinExecutor {
    pub fn new(
        plan: NestedLoopJoinPlan,
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
    ) -> Self {
        Self {
            plan,
            left,
            right,
            current_left: None,
            initialized: false,
        }
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        self.left.init()?;
        self.right.init()?;
        self.current_left = self.left.next()?.map(|(tuple, _)| tuple);
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> ExecutionResult<Option<(Tuple, Rid)>> {
        if !self.initialized {
            self.init()?;
        }

        loop {
            let left_tuple = match &self.current_left {
                Some(tuple) => tuple.clone(),
                None => return Ok(None),
            };

            match self.right.next()? {
                Some((right_tuple, _)) => {
                    let passes = self.plan.predicate.as_ref().map_or(true, |p| {
                        p.evaluate_join(
                            &left_tuple,
                            self.left.output_schema(),
                            &right_tuple,
                            self.right.output_schema(),
                        )
                        .is_true()
                    });
                    if !passes {
                        continue;
                    }

                    let values = self
                        .plan
                        .output_exprs
                        .iter()
                        .map(|e| {
                            e.evaluate_join(
                                &left_tuple,
                                self.left.output_schema(),
                                &right_tuple,
                                self.right.output_schema(),
                            )
                        })
                        .collect();
                    return Ok(Some((Tuple::new(values), Rid::INVALID)));
                }
                None => {
                    // Inner exhausted: advance the outer row and rescan
                    self.right.init()?;
                    self.current_left = self.left.next()?.map(|(tuple, _)| tuple);
                }
            }
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.plan.output_schema
    }
}
