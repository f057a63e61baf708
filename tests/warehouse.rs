use std::collections::HashSet;

use rust_decimal::Decimal;

use finance_etl::config::WarehouseConfig;
use finance_etl::domain::{columns, Entity};
use finance_etl::processing::normalized_schema;
use finance_etl::types::{DataSet, Value};
use finance_etl::warehouse::{Table, Warehouse};
use finance_etl::WarehouseError;

fn utf8(s: &str) -> Value {
    Value::Utf8(s.to_string())
}

fn customers(n: usize) -> DataSet {
    let rows = (1..=n)
        .map(|i| {
            vec![
                Value::Utf8(format!("C{i:04}")),
                Value::Utf8(format!("Customer_{i}")),
                Value::Utf8(format!("customer{i}@email.com")),
                Value::Null,
                utf8("REGULAR"),
            ]
        })
        .collect();
    DataSet::new(normalized_schema(Entity::Customer), rows)
}

/// Normalized products carry `interest_rate`, which the table does not store.
fn products() -> DataSet {
    DataSet::new(
        normalized_schema(Entity::FinancialProduct),
        vec![vec![utf8("P01"), utf8("Savings Account"), utf8("DEBIT"), Value::Null]],
    )
    .select(Table::Products.columns())
    .unwrap()
}

fn transaction(id: &str, customer: &str) -> Vec<Value> {
    vec![
        utf8(id),
        utf8(customer),
        utf8("P01"),
        Value::Decimal(Decimal::new(1999, 2)),
        Value::Null,
        utf8("INFLOW"),
    ]
}

fn open(dir: &tempfile::TempDir, batch_size: usize) -> Warehouse {
    Warehouse::open(&WarehouseConfig {
        path: dir.path().join("nested/warehouse.db"),
        batch_size,
    })
    .unwrap()
}

#[test]
fn reset_empties_every_table_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut wh = open(&dir, 100);

    assert!(wh.load(&customers(3), Table::Customers).is_complete());
    assert!(wh.load(&products(), Table::Products).is_complete());
    let tx = DataSet::new(
        normalized_schema(Entity::Transaction),
        vec![transaction("T1", "C0001"), transaction("T2", "C0002")],
    );
    assert!(wh.load(&tx, Table::Transactions).is_complete());
    assert_eq!(wh.row_count(Table::Transactions).unwrap(), 2);

    wh.reset_schema().unwrap();
    wh.reset_schema().unwrap();
    for table in Table::DELETE_ORDER {
        assert_eq!(wh.row_count(table).unwrap(), 0, "{table} not empty");
    }
}

#[test]
fn confirmed_ids_round_trip_committed_customers() {
    let dir = tempfile::tempdir().unwrap();
    let mut wh = open(&dir, 7);

    let report = wh.load(&customers(40), Table::Customers);
    assert_eq!(report.committed, 40);

    let ids = wh.confirmed_ids(Table::Customers, columns::CUSTOMER_ID).unwrap();
    let expected: HashSet<String> = (1..=40).map(|i| format!("C{i:04}")).collect();
    assert_eq!(ids, expected);
}

#[test]
fn data_survives_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut wh = open(&dir, 10);
        wh.load(&customers(5), Table::Customers);
    }
    let wh = open(&dir, 10);
    assert_eq!(wh.row_count(Table::Customers).unwrap(), 5);
}

#[test]
fn loads_with_extra_columns_are_refused() {
    let mut wh = Warehouse::open_in_memory(10).unwrap();
    let raw = DataSet::new(
        normalized_schema(Entity::FinancialProduct),
        vec![vec![utf8("P01"), utf8("Savings Account"), utf8("DEBIT"), Value::Null]],
    );
    let report = wh.load(&raw, Table::Products);
    assert_eq!(report.committed, 0);
    assert_eq!(report.failure.as_ref().and_then(|f| f.chunk), None);
    assert_eq!(wh.row_count(Table::Products).unwrap(), 0);
}

#[test]
fn confirmed_ids_refuse_columns_outside_the_table() {
    let wh = Warehouse::open_in_memory(10).unwrap();
    let err = wh
        .confirmed_ids(Table::Customers, "name; DROP TABLE customers")
        .unwrap_err();
    assert!(matches!(err, WarehouseError::UnknownColumn { .. }));
}

#[test]
fn foreign_keys_are_enforced_by_the_database() {
    let mut wh = Warehouse::open_in_memory(10).unwrap();
    wh.load(&customers(1), Table::Customers);
    wh.load(&products(), Table::Products);

    let tx = DataSet::new(
        normalized_schema(Entity::Transaction),
        vec![transaction("T1", "C0001"), transaction("T2", "C9999")],
    );
    let report = wh.load(&tx, Table::Transactions);

    assert_eq!(report.committed, 0);
    assert_eq!(report.failure.as_ref().and_then(|f| f.chunk), Some(0));
    assert_eq!(wh.row_count(Table::Transactions).unwrap(), 0);
}

#[test]
fn duplicate_email_rolls_back_only_its_chunk() {
    let mut wh = Warehouse::open_in_memory(3).unwrap();
    let mut ds = customers(9);
    // Row 7 (chunk 2) reuses row 1's email.
    ds.rows[7][2] = utf8("customer1@email.com");

    let report = wh.load(&ds, Table::Customers);
    assert_eq!(report.attempted, 9);
    assert_eq!(report.committed, 6);
    assert_eq!(report.failure.as_ref().map(|f| (f.chunk, f.rows)), Some((Some(2), 3)));

    let ids = wh.confirmed_ids(Table::Customers, columns::CUSTOMER_ID).unwrap();
    assert_eq!(ids.len(), 6);
    assert!(!ids.contains("C0007"));
}

#[test]
fn unreachable_path_is_a_setup_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, "file").unwrap();

    let err = Warehouse::open(&WarehouseConfig {
        path: blocker.join("warehouse.db"),
        batch_size: 10,
    })
    .unwrap_err();
    assert!(matches!(err, WarehouseError::Setup { .. }));
}
