// Hash join
//
// Equality join in two phases: `init` drains the left (build) child into
// an in-memory multimap keyed by the left key expression; `next` pulls
// right (probe) rows one at a time and walks the matching bucket with a
// cursor that persists across calls, so a right row with several matches
// emits them one per `next`.

use std::collections::HashMap;

use crate::catalog::{DataValue, Schema, Tuple};
use crate::common::types::Rid;
use crate::query::executor::plans::HashJoinPlan;
use crate::query::executor::{ExecutionResult, Executor};

pub struct HashJoinExecutor {
    plan: HashJoinPlan,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    hash_table: HashMap<DataValue, Vec<Tuple>>,
    current_right: Option<Tuple>,
    /// Position inside the current right row's match bucket
    cursor: usize,
    initialized: bool,
}

impl HashJoinExecutor {
    pub fn new(plan: HashJoinPlan, left: Box<dyn Executor>, right: Box<dyn Executor>) -> Self {
        Self {
            plan,
            left,
            right,
            hash_table: HashMap::new(),
            current_right: None,
            cursor: 0,
            initialized: false,
        }
    }
}

impl Executor for HashJoinExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        self.left.init()?;
        self.right.init()?;

        self.hash_table.clear();
        while let Some((tuple, _)) = self.left.next()? {
            let key = self
                .plan
                .left_key_expr
                .evaluate(&tuple, self.left.output_schema());
            self.hash_table.entry(key).or_default().push(tuple);
        }

        self.current_right = self.right.next()?.map(|(tuple, _)| tuple);
        self.cursor = 0;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> ExecutionResult<Option<(Tuple, Rid)>> {
        if !self.initialized {
            self.init()?;
        }

        loop {
            let right_tuple = match &self.current_right {
                Some(tuple) => tuple.clone(),
                None => return Ok(None),
            };

            let key = self
                .plan
                .right_key_expr
                .evaluate(&right_tuple, self.right.output_schema());

            if let Some(matches) = self.hash_table.get(&key) {
                if self.cursor < matches.len() {
                    let left_tuple = matches[self.cursor].clone();
                    self.cursor += 1;

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
            }

            // Bucket exhausted (or no matches): advance the probe side
            self.current_right = self.right.next()?.map(|(tuple, _)| tuple);
            self.cursor = 0;
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.plan.output_schema
    }
}
