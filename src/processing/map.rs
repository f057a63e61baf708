//! Row mapping for [`crate::types::DataSet`].

use crate::types::{DataSet, Schema, Value};

/// Returns a new [`DataSet`] with `schema` by applying `mapper` to every row.
///
/// This is a convenience wrapper around [`DataSet::map_rows_into`].
///
/// # Panics
///
/// Panics if `mapper` returns rows with a different length than `schema`.
pub fn map_into<F>(dataset: &DataSet, schema: Schema, mapper: F) -> DataSet
where
    F: FnMut(&[Value]) -> Vec<Value>,
{
    dataset.map_rows_into(schema, mapper)
}
