//! Referential filter of transactions against identifiers the warehouse has committed.

use std::collections::HashSet;

use tracing::{error, warn};

use crate::domain::columns;
use crate::processing::split;
use crate::quality::RowView;
use crate::types::DataSet;
use crate::warehouse::{Table, Warehouse};

/// Post-commit identifier snapshot; the authoritative foreign-key universe for transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmedIds {
    pub customers: HashSet<String>,
    pub products: HashSet<String>,
}

impl ConfirmedIds {
    /// Read both id sets from `warehouse`. A failed read is logged and yields an empty set.
    pub fn snapshot(warehouse: &Warehouse) -> Self {
        let read = |table: Table, column: &str| {
            warehouse.confirmed_ids(table, column).unwrap_or_else(|err| {
                error!(table = %table, error = %err, "confirmed id read failed; using empty set");
                HashSet::new()
            })
        };
        Self {
            customers: read(Table::Customers, columns::CUSTOMER_ID),
            products: read(Table::Products, columns::PRODUCT_ID),
        }
    }
}

/// Transactions split by whether both foreign keys are confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossFilter {
    pub retained: DataSet,
    pub orphaned: DataSet,
}

/// Keep transactions whose `customer_id` and `product_id` are both in `ids`.
///
/// A null or blank foreign key is never confirmed.
pub fn cross_filter(transactions: &DataSet, ids: &ConfirmedIds) -> CrossFilter {
    let (retained, orphaned) = split(transactions, |_, row| {
        let row = RowView::new(&transactions.schema, row);
        let customer_ok = row
            .text(columns::CUSTOMER_ID)
            .is_some_and(|id| ids.customers.contains(id));
        let product_ok = row
            .text(columns::PRODUCT_ID)
            .is_some_and(|id| ids.products.contains(id));
        customer_ok && product_ok
    });

    if !orphaned.is_empty() {
        warn!(
            orphaned = orphaned.row_count(),
            retained = retained.row_count(),
            "transactions dropped: foreign keys not in warehouse"
        );
    }

    CrossFilter { retained, orphaned }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Entity;
    use crate::processing::normalized_schema;
    use crate::types::Value;

    fn tx(id: &str, customer: Option<&str>, product: &str) -> Vec<Value> {
        vec![
            Value::Utf8(id.to_string()),
            customer.map_or(Value::Null, |c| Value::Utf8(c.to_string())),
            Value::Utf8(product.to_string()),
            Value::Null,
            Value::Null,
            Value::Null,
        ]
    }

    fn ids(customers: &[&str], products: &[&str]) -> ConfirmedIds {
        ConfirmedIds {
            customers: customers.iter().map(|s| s.to_string()).collect(),
            products: products.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn both_keys_must_be_confirmed() {
        let ds = DataSet::new(
            normalized_schema(Entity::Transaction),
            vec![
                tx("T1", Some("C1"), "P01"),
                tx("T2", Some("C1"), "P99"),
                tx("T3", Some("C9"), "P01"),
                tx("T4", None, "P01"),
            ],
        );
        let out = cross_filter(&ds, &ids(&["C1"], &["P01"]));
        assert_eq!(out.retained.row_count(), 1);
        assert_eq!(out.orphaned.row_count(), 3);
        assert_eq!(out.retained.rows[0][0], Value::Utf8("T1".to_string()));
    }

    #[test]
    fn removing_a_customer_drops_exactly_its_transactions() {
        let ds = DataSet::new(
            normalized_schema(Entity::Transaction),
            vec![
                tx("T1", Some("C1"), "P01"),
                tx("T2", Some("C2"), "P01"),
                tx("T3", Some("C1"), "P01"),
            ],
        );
        let full = cross_filter(&ds, &ids(&["C1", "C2"], &["P01"]));
        let reduced = cross_filter(&ds, &ids(&["C2"], &["P01"]));

        assert_eq!(full.retained.row_count(), 3);
        assert_eq!(reduced.retained.rows, vec![ds.rows[1].clone()]);
        assert_eq!(reduced.orphaned.rows, vec![ds.rows[0].clone(), ds.rows[2].clone()]);
    }

    #[test]
    fn snapshot_reads_from_the_warehouse() {
        let wh = Warehouse::open_in_memory(10).unwrap();
        wh.connection()
            .execute("INSERT INTO customers (customer_id, name) VALUES ('C1', 'Ana')", [])
            .unwrap();
        let snap = ConfirmedIds::snapshot(&wh);
        assert_eq!(snap.customers, HashSet::from(["C1".to_string()]));
        assert!(snap.products.is_empty());
    }
}
