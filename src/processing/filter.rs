//! Row partitioning for [`crate::types::DataSet`].

use crate::types::{DataSet, Value};

/// Split `dataset` into `(matching, non_matching)` by a per-row mask.
///
/// `keep` is called once per row with the row index. Both outputs preserve the input schema and
/// row order.
pub fn split<F>(dataset: &DataSet, mut keep: F) -> (DataSet, DataSet)
where
    F: FnMut(usize, &[Value]) -> bool,
{
    let mut matching = DataSet::empty(dataset.schema.clone());
    let mut rest = DataSet::empty(dataset.schema.clone());
    for (idx, row) in dataset.rows.iter().enumerate() {
        if keep(idx, row) {
            matching.rows.push(row.clone());
        } else {
            rest.rows.push(row.clone());
        }
    }
    (matching, rest)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::split;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn sample_dataset() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("transaction_id", DataType::Utf8),
            Field::new("amount", DataType::Decimal),
        ]);

        let rows = vec![
            vec![Value::Utf8("TX1".to_string()), Value::Decimal(Decimal::new(-500, 0))],
            vec![Value::Utf8("TX2".to_string()), Value::Decimal(Decimal::new(20, 0))],
            vec![Value::Utf8("TX3".to_string()), Value::Decimal(Decimal::new(30, 0))],
        ];

        DataSet::new(schema, rows)
    }

    #[test]
    fn split_partitions_rows_in_order() {
        let ds = sample_dataset();
        let (even, odd) = split(&ds, |idx, _| idx % 2 == 0);
        assert_eq!(even.row_count() + odd.row_count(), ds.row_count());
        assert_eq!(even.rows, vec![ds.rows[0].clone(), ds.rows[2].clone()]);
        assert_eq!(odd.rows, vec![ds.rows[1].clone()]);
    }

    #[test]
    fn split_by_value_keeps_schema_on_both_sides() {
        let ds = sample_dataset();
        let idx = ds.schema.index_of("amount").unwrap();

        let (positive, rest) = split(&ds, |_, row| {
            row[idx].as_decimal().is_some_and(|d| d > Decimal::ZERO)
        });

        assert_eq!(positive.schema, ds.schema);
        assert_eq!(rest.schema, ds.schema);
        assert_eq!(positive.rows[0][0], Value::Utf8("TX2".to_string()));
        assert_eq!(rest.row_count(), 1);
        // Original unchanged
        assert_eq!(ds.row_count(), 3);
    }
}
