// Typed scalar values
//
// Rows are vectors of these; they also serve as hash and group keys, so
// equality and hashing must be total (floats hash by bit pattern).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use serde::{Deserialize, Serialize};

/// Possible data types for values in a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

impl Eq for DataValue {}

impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Type discriminant first to avoid cross-type collisions
        match self {
            DataValue::Null => {
                0.hash(state);
            }
            DataValue::Integer(i) => {
                1.hash(state);
                i.hash(state);
            }
            DataValue::Float(f) => {
                2.hash(state);
                f.to_bits().hash(state);
            }
            DataValue::Text(s) => {
                3.hash(state);
                s.hash(state);
            }
            DataValue::Boolean(b) => {
                4.hash(state);
                b.hash(state);
            }
        }
    }
}

impl PartialOrd for DataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            // Null is incomparable with anything
            (DataValue::Null, _) | (_, DataValue::Null) => None,

            (DataValue::Integer(a), DataValue::Integer(b)) => a.partial_cmp(b),
            (DataValue::Float(a), DataValue::Float(b)) => a.partial_cmp(b),

            // Integer and float can be compared
            (DataValue::Integer(a), DataValue::Float(b)) => (*a as f64).partial_cmp(b),
            (DataValue::Float(a), DataValue::Integer(b)) => a.partial_cmp(&(*b as f64)),

            (DataValue::Text(a), DataValue::Text(b)) => a.partial_cmp(b),
            (DataValue::Boolean(a), DataValue::Boolean(b)) => a.partial_cmp(b),

            _ => None,
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => write!(f, "NULL"),
            DataValue::Integer(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::Text(s) => write!(f, "\"{}\"", s),
            DataValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl DataValue {
    /// Numeric addition, promoting integers to floats on mixed input.
    /// Returns `None` for non-numeric operands or overflow.
    pub fn add(&self, other: &DataValue) -> Option<DataValue> {
        match (self, other) {
            (DataValue::Integer(a), DataValue::Integer(b)) => {
                a.checked_add(*b).map(DataValue::Integer)
            }
            (DataValue::Float(a), DataValue::Float(b)) => Some(DataValue::Float(a + b)),
            (DataValue::Integer(a), DataValue::Float(b)) => Some(DataValue::Float(*a as f64 + b)),
            (DataValue::Float(a), DataValue::Integer(b)) => Some(DataValue::Float(a + *b as f64)),
            _ => None,
        }
    }

    /// Numeric subtraction with the same promotion rules as `add`.
    pub fn subtract(&self, other: &DataValue) -> Option<DataValue> {
        match (self, other) {
            (DataValue::Integer(a), DataValue::Integer(b)) => {
                a.checked_sub(*b).map(DataValue::Integer)
            }
            (DataValue::Float(a), DataValue::Float(b)) => Some(DataValue::Float(a - b)),
            (DataValue::Integer(a), DataValue::Float(b)) => Some(DataValue::Float(*a as f64 - b)),
            (DataValue::Float(a), DataValue::Integer(b)) => Some(DataValue::Float(a - *b as f64)),
            _ => None,
        }
    }

    /// Numeric multiplication with the same promotion rules as `add`.
    pub fn multiply(&self, other: &DataValue) -> Option<DataValue> {
        match (self, other) {
            (DataValue::Integer(a), DataValue::Integer(b)) => {
                a.checked_mul(*b).map(DataValue::Integer)
            }
            (DataValue::Float(a), DataValue::Float(b)) => Some(DataValue::Float(a * b)),
            (DataValue::Integer(a), DataValue::Float(b)) => Some(DataValue::Float(*a as f64 * b)),
            (DataValue::Float(a), DataValue::Integer(b)) => Some(DataValue::Float(a * *b as f64)),
            _ => None,
        }
    }

    /// Numeric division. Integer operands divide as integers; any zero
    /// divisor yields `None`.
    pub fn divide(&self, other: &DataValue) -> Option<DataValue> {
        let divisor_is_zero = matches!(other, DataValue::Integer(0))
            || matches!(other, DataValue::Float(f) if *f == 0.0);
        if divisor_is_zero {
            return None;
        }
        match (self, other) {
            (DataValue::Integer(a), DataValue::Integer(b)) => {
                a.checked_div(*b).map(DataValue::Integer)
            }
            (DataValue::Float(a), DataValue::Float(b)) => Some(DataValue::Float(a / b)),
            (DataValue::Integer(a), DataValue::Float(b)) => Some(DataValue::Float(*a as f64 / b)),
            (DataValue::Float(a), DataValue::Integer(b)) => Some(DataValue::Float(a / *b as f64)),
            _ => None,
        }
    }

    /// Predicate truth: only `Boolean(true)` passes.
    pub fn is_true(&self) -> bool {
        matches!(self, DataValue::Boolean(true))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }
}
