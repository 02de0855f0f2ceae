// Expression evaluation
//
// Expressions are a closed set of tagged variants rather than trait
// objects; operators walk them with the evaluation mode their plan calls
// for (single tuple, joined pair, or aggregate row).

use crate::catalog::schema::Schema;
use crate::catalog::tuple::Tuple;
use crate::catalog::value::DataValue;

/// Which child of a join a column reference resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    /// Non-numeric operands, overflow, and zero divisors all collapse to
    /// NULL, which comparisons then treat as incomparable.
    fn apply(self, left: &DataValue, right: &DataValue) -> DataValue {
        let result = match self {
            ArithmeticOp::Add => left.add(right),
            ArithmeticOp::Subtract => left.subtract(right),
            ArithmeticOp::Multiply => left.multiply(right),
            ArithmeticOp::Divide => left.divide(right),
        };
        result.unwrap_or(DataValue::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOp {
    fn apply(self, left: &DataValue, right: &DataValue) -> bool {
        match self {
            ComparisonOp::Eq => left == right,
            ComparisonOp::NotEq => left != right,
            // Incomparable operands (e.g. NULL) fail ordered comparisons
            ComparisonOp::Lt => matches!(left.partial_cmp(right), Some(std::cmp::Ordering::Less)),
            ComparisonOp::LtEq => matches!(
                left.partial_cmp(right),
                Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
            ),
            ComparisonOp::Gt => {
                matches!(left.partial_cmp(right), Some(std::cmp::Ordering::Greater))
            }
            ComparisonOp::GtEq => matches!(
                left.partial_cmp(right),
                Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal value
    Constant(DataValue),
    /// A column of the input tuple; `side` matters only under join evaluation
    ColumnValue { side: Side, index: usize },
    /// Comparison of two sub-expressions, yielding a boolean
    Comparison {
        op: ComparisonOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// Numeric combination of two sub-expressions
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// The i-th GROUP BY value of an aggregate row
    GroupByRef(usize),
    /// The i-th aggregate value of an aggregate row
    AggregateRef(usize),
}

impl Expression {
    pub fn column(index: usize) -> Expression {
        Expression::ColumnValue {
            side: Side::Left,
            index,
        }
    }

    pub fn join_column(side: Side, index: usize) -> Expression {
        Expression::ColumnValue { side, index }
    }

    pub fn comparison(op: ComparisonOp, left: Expression, right: Expression) -> Expression {
        Expression::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn arithmetic(op: ArithmeticOp, left: Expression, right: Expression) -> Expression {
        Expression::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Evaluate against a single tuple.
    pub fn evaluate(&self, tuple: &Tuple, schema: &Schema) -> DataValue {
        match self {
            Expression::Constant(value) => value.clone(),
            Expression::ColumnValue { index, .. } => {
                debug_assert!(*index < schema.column_count());
                tuple.value(*index).clone()
            }
            Expression::Comparison { op, left, right } => {
                let l = left.evaluate(tuple, schema);
                let r = right.evaluate(tuple, schema);
                DataValue::Boolean(op.apply(&l, &r))
            }
            Expression::Arithmetic { op, left, right } => {
                let l = left.evaluate(tuple, schema);
                let r = right.evaluate(tuple, schema);
                op.apply(&l, &r)
            }
            Expression::GroupByRef(_) | Expression::AggregateRef(_) => DataValue::Null,
        }
    }

    /// Evaluate against a pair of joined tuples.
    pub fn evaluate_join(
        &self,
        left_tuple: &Tuple,
        left_schema: &Schema,
        right_tuple: &Tuple,
        right_schema: &Schema,
    ) -> DataValue {
        match self {
            Expression::Constant(value) => value.clone(),
            Expression::ColumnValue { side, index } => match side {
                Side::Left => {
                    debug_assert!(*index < left_schema.column_count());
                    left_tuple.value(*index).clone()
                }
                Side::Right => {
                    debug_assert!(*index < right_schema.column_count());
                    right_tuple.value(*index).clone()
                }
            },
            Expression::Comparison { op, left, right } => {
                let l = left.evaluate_join(left_tuple, left_schema, right_tuple, right_schema);
                let r = right.evaluate_join(left_tuple, left_schema, right_tuple, right_schema);
                DataValue::Boolean(op.apply(&l, &r))
            }
            Expression::Arithmetic { op, left, right } => {
                let l = left.evaluate_join(left_tuple, left_schema, right_tuple, right_schema);
                let r = right.evaluate_join(left_tuple, left_schema, right_tuple, right_schema);
                op.apply(&l, &r)
            }
            Expression::GroupByRef(_) | Expression::AggregateRef(_) => DataValue::Null,
        }
    }

    /// Evaluate against one aggregate row: its group-by key and its
    /// aggregate values.
    pub fn evaluate_aggregate(
        &self,
        group_bys: &[DataValue],
        aggregates: &[DataValue],
    ) -> DataValue {
        match self {
            Expression::Constant(value) => value.clone(),
            Expression::GroupByRef(index) => group_bys[*index].clone(),
            Expression::AggregateRef(index) => aggregates[*index].clone(),
            Expression::Comparison { op, left, right } => {
                let l = left.evaluate_aggregate(group_bys, aggregates);
                let r = right.evaluate_aggregate(group_bys, aggregates);
                DataValue::Boolean(op.apply(&l, &r))
            }
            Expression::Arithmetic { op, left, right } => {
                let l = left.evaluate_aggregate(group_bys, aggregates);
                let r = right.evaluate_aggregate(group_bys, aggregates);
                op.apply(&l, &r)
            }
            Expression::ColumnValue { .. } => DataValue::Null,
        }
    }
}
