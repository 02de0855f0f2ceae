use serde::{Deserialize, Serialize};

use crate::catalog::schema::Schema;
use crate::catalog::value::DataValue;

/// A row: an ordered vector of values matching some schema.
///
/// Tuples serialize with bincode for storage in heap pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuple {
    values: Vec<DataValue>,
}

impl Tuple {
    pub fn new(values: Vec<DataValue>) -> Self {
        Self { values }
    }

    pub fn value(&self, index: usize) -> &DataValue {
        &self.values[index]
    }

    pub fn values(&self) -> &[DataValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<DataValue> {
        self.values
    }

    /// Build an index key tuple by projecting `key_attrs` out of this tuple.
    pub fn key_from_tuple(
        &self,
        src_schema: &Schema,
        key_schema: &Schema,
        key_attrs: &[usize],
    ) -> Tuple {
        debug_assert_eq!(self.values.len(), src_schema.column_count());
        debug_assert_eq!(key_attrs.len(), key_schema.column_count());

        Tuple::new(key_attrs.iter().map(|&i| self.values[i].clone()).collect())
    }
}
