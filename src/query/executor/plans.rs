// Physical plan nodes
//
// Plans carry the static shape of an operator: target table, predicate
// and projection expressions, and the output schema. Executors hold the
// runtime state.

use std::collections::HashMap;

use crate::catalog::{DataValue, Expression, Schema, TableOid};

#[derive(Debug, Clone)]
pub struct SeqScanPlan {
    pub table_oid: TableOid,
    /// Evaluated against the raw table row, before projection
    pub predicate: Option<Expression>,
    pub output_schema: Schema,
    /// One expression per output column
    pub output_exprs: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct InsertPlan {
    pub table_oid: TableOid,
    /// Literal rows for a raw insert; `None` means pull from the child
    pub raw_values: Option<Vec<Vec<DataValue>>>,
}

#[derive(Debug, Clone)]
pub struct DeletePlan {
    pub table_oid: TableOid,
}

/// How an update plan rewrites one column
#[derive(Debug, Clone)]
pub enum UpdateAction {
    Set(DataValue),
    Add(DataValue),
}

#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub table_oid: TableOid,
    /// column index -> rewrite
    pub update_attrs: HashMap<usize, UpdateAction>,
}

#[derive(Debug, Clone)]
pub struct NestedLoopJoinPlan {
    /// Evaluated with the outer row on the left and the inner on the right
    pub predicate: Option<Expression>,
    pub output_schema: Schema,
    pub output_exprs: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct HashJoinPlan {
    pub left_key_expr: Expression,
    pub right_key_expr: Expression,
    pub output_schema: Schema,
    pub output_exprs: Vec<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationType {
    CountStar,
    Count,
    Sum,
    Min,
    Max,
}

#[derive(Debug, Clone)]
pub struct AggregationPlan {
    pub group_by_exprs: Vec<Expression>,
    /// Input expression per aggregate (ignored by CountStar)
    pub agg_exprs: Vec<Expression>,
    pub agg_types: Vec<AggregationType>,
    /// Evaluated per aggregate row via `evaluate_aggregate`
    pub having: Option<Expression>,
    pub output_schema: Schema,
    pub output_exprs: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub struct LimitPlan {
    pub limit: usize,
}
