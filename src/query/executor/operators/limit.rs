use crate::catalog::{Schema, Tuple};
use crate::common::types::Rid;
use crate::query::executor::plans::LimitPlan;
use crate::query::executor::{ExecutionResult, Executor};

/// Limit: pass through at most N child rows, then stop pulling.
pub struct LimitExecutor {
    plan: LimitPlan,
    child: Box<dyn Executor>,
    emitted: usize,
    initialized: bool,
}

impl LimitExecutor {
    pub fn new(plan: LimitPlan, child: Box<dyn Executor>) -> Self {
        Self {
            plan,
            child,
            emitted: 0,
            initialized: false,
        }
    }
}

impl Executor for LimitExecutor {
    fn init(&mut self) -> ExecutionResult<()> {
        self.child.init()?;
        self.emitted = 0;
        self.initialized = true;
        Ok(())
    }

    fn next(&mut self) -> ExecutionResult<Option<(Tuple, Rid)>> {
        if !self.initialized {
            self.init()?;
        }

        if self.emitted >= self.plan.limit {
            return Ok(None);
        }
        match self.child.next()? {
            Some(row) => {
                self.emitted += 1;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    fn output_schema(&self) -> &Schema {
        self.child.output_schema()
    }
}
