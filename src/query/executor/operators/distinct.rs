use std::collections::HashSet;

use crate::catalog::{DataValue, Schema, Tuple};
use crate::common::types::Rid;
use crate::query::executor::{ExecutionResult, Executor};

/// Distinct: emit only the first occurrence of each row, keyed on all
/// output-schema columns.
pub struct DistinctExecutor {
    child: Box<dyn Executor>,
    seen: HashSet<Vec<DataValue>>,
    initialized: bool,
}

impl DistinctExecutor {
    pub fn new(child: Box<dyn Executor>) -> Self {
        Self {
            child,
            seen: HashSet::new(),
            initialized: false,
        }
    }
}

impl Executor for DistinctExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        self.child.init()?;
        self.seen.clear();
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> ExecutionResult<Option<(Tuple, Rid)>> {
        if !self.initialized {
            self.init()?;
        }

        while let Some((tuple, rid)) = self.child.next()? {
            let key = tuple.values().to_vec();
            if self.seen.insert(key) {
                return Ok(Some((tuple, rid)));
            }
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Schema {
        self.child.output_schema()
    }
}
