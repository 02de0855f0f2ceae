// Query Executor Module
//
// Volcano-style pull execution: every operator implements `init` once
// and `next` repeatedly until it yields `None`.

mod context;
mod error;
pub mod operators;
pub mod plans;

use crate::catalog::{Schema, Tuple};
use crate::common::types::Rid;

pub use context::ExecutorContext;
pub use error::{ExecutionError, ExecutionResult};

/// The iterator contract shared by all physical operators.
///
/// `init` may consume a child entirely (blocking operators build their
/// state there); `next` pulls one output row at a time, `None` signaling
/// end of stream. Child ownership is unique and the tree is acyclic.
pub trait Executor {
    fn init(&mut self) -> ExecutionResult<()>;

    fn next(&mut self) -> ExecutionResult<Option<(Tuple, Rid)>>;

    fn output_schema(&self) -> &Schema;
}
