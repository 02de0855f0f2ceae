// Hash aggregation
//
// `init` drains the child into a grouping hash table, one running state
// per aggregate per group; `next` walks the finalized groups, applying
// the HAVING clause. Insertion order is preserved so output order is
// deterministic.

use linked_hash_map::LinkedHashMap;

use crate::catalog::{DataValue, Schema, Tuple};
use crate::common::types::Rid;
use crate::query::executor::plans::{AggregationPlan, AggregationType};
use crate::query::executor::{ExecutionError, ExecutionResult, Executor};

/// Running state of one aggregate inside one group.
struct AggregateState {
    agg_type: AggregationType,
    count: i64,
    value: Option<DataValue>,
}

impl AggregateState {
    fn new(agg_type: AggregationType) -> Self {
        Self {
            agg_type,
            count: 0,
            value: None,
        }
    }

    /// Fold one input value into the state. NULLs are skipped everywhere
    /// except COUNT(*).
    fn combine(&mut self, input: DataValue) -> ExecutionResult<()> {
        match self.agg_type {
            AggregationType::CountStar => {
                self.count += 1;
            }
            AggregationType::Count => {
                if !input.is_null() {
                    self.count += 1;
                }
            }
            AggregationType::Sum => {
                if !input.is_null() {
                    self.value = Some(match self.value.take() {
                        None => input,
                        Some(acc) => acc.add(&input).ok_or_else(|| {
                            ExecutionError::TypeError(format!("cannot sum {}", input))
                        })?,
                    });
                }
            }
            AggregationType::Min => {
                if !input.is_null() {
                    let replace = match &self.value {
                        None => true,
                        Some(current) => input < *current,
                    };
                    if replace {
                        self.value = Some(input);
                    }
                }
            }
            AggregationType::Max => {
                if !input.is_null() {
                    let replace = match &self.value {
                        None => true,
                        Some(current) => input > *current,
                    };
                    if replace {
                        self.value = Some(input);
                    }
                }
            }
        }
        Ok(())
    }

    fn finalize(self) -> DataValue {
        match self.agg_type {
            AggregationType::CountStar | AggregationType::Count => DataValue::Integer(self.count),
            AggregationType::Sum | AggregationType::Min | AggregationType::Max => {
                self.value.unwrap_or(DataValue::Null)
            }
        }
    }
}

pub struct AggregationExecutor {
    plan: AggregationPlan,
    child: Box<dyn Executor>,
    /// Finalized (group_bys, aggregates) rows, in first-seen group order
    groups: Vec<(Vec<DataValue>, Vec<DataValue>)>,
    cursor: usize,
    initialized: bool,
}

impl AggregationExecutor {
    pub fn new(plan: AggregationPlan, child: Box<dyn Executor>) -> Self {
        Self {
            plan,
            child,
            groups: Vec::new(),
            cursor: 0,
            initialized: false,
        }
    }
}

impl Executor for AggregationExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        self.child.init()?;

        let mut table: LinkedHashMap<Vec<DataValue>, Vec<AggregateState>> = LinkedHashMap::new();
        while let Some((tuple, _)) = self.child.next()? {
            let schema = self.child.output_schema();
            let key: Vec<DataValue> = self
                .plan
                .group_by_exprs
                .iter()
                .map(|e| e.evaluate(&tuple, schema))
                .collect();

            let states = table.entry(key).or_insert_with(|| {
                self.plan
                    .agg_types
                    .iter()
                    .map(|&agg_type| AggregateState::new(agg_type))
                    .collect()
            });
            for (i, state) in states.iter_mut().enumerate() {
                let input = self.plan.agg_exprs[i].evaluate(&tuple, schema);
                state.combine(input)?;
            }
        }

        self.groups = table
            .into_iter()
            .map(|(key, states)| {
                (
                    key,
                    states.into_iter().map(AggregateState::finalize).collect(),
                )
            })
            .collect();
        self.cursor = 0;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> ExecutionResult<Option<(Tuple, Rid)>> {
        if !self.initialized {
            self.init()?;
        }

        while self.cursor < self.groups.len() {
            let (group_bys, aggregates) = &self.groups[self.cursor];
            self.cursor += 1;

            let passes = self.plan.having.as_ref().map_or(true, |h| {
                h.evaluate_aggregate(group_bys, aggregates).is_true()
            });
            if !passes {
                continue;
            }

            let values = self
                .plan
                .output_exprs
                .iter()
                .map(|e| e.evaluate_aggregate(group_bys, aggregates))
                .collect();
            return Ok(Some((Tuple::new(values), Rid::INVALID)));
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Schema {
        &self.plan.output_schema
    }
}
