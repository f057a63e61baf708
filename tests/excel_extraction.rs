#![cfg(feature = "xlsx_writer")]

use std::path::Path;

use rust_decimal::Decimal;
use rust_xlsxwriter::{Formula, Workbook};

use finance_etl::domain::{columns, Entity};
use finance_etl::ingestion::{Extractor, SourceDescriptor};
use finance_etl::processing::normalize;
use finance_etl::types::{DataSet, Value};

fn cell<'a>(ds: &'a DataSet, row: usize, column: &str) -> &'a Value {
    let idx = ds.schema.index_of(column).unwrap();
    &ds.rows[row][idx]
}

/// Two sheets: a notes sheet first, then the product master with an extra column.
fn write_product_master(path: &Path) {
    let mut wb = Workbook::new();

    let notes = wb.add_worksheet();
    notes.set_name("notes").unwrap();
    notes.write_string(0, 0, "exported by treasury").unwrap();

    let ws = wb.add_worksheet();
    ws.set_name("master").unwrap();
    for (col, header) in ["product_id", "product_name", "product_type", "interest_rate", "owner"]
        .into_iter()
        .enumerate()
    {
        ws.write_string(0, col as u16, header).unwrap();
    }
    let rows = [
        ("P01", "savings account", "DEBITO", 0.01),
        ("P02", "gold card", "CREDITO", 0.45),
        ("P04", "investment 365", "INVERSION", 0.11),
    ];
    for (i, (id, name, kind, rate)) in rows.into_iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_string(row, 0, id).unwrap();
        ws.write_string(row, 1, name).unwrap();
        ws.write_string(row, 2, kind).unwrap();
        ws.write_number(row, 3, rate).unwrap();
        ws.write_string(row, 4, "treasury").unwrap();
    }

    wb.save(path).unwrap();
}

#[test]
fn named_sheet_is_extracted_and_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("products_master.xlsx");
    write_product_master(&path);

    let source = SourceDescriptor {
        path,
        format: None,
        sheet: Some("master".to_string()),
    };
    let out = Extractor::default().extract(&source, &Entity::FinancialProduct.raw_schema());
    assert!(out.is_available());

    let raw = out.into_dataset();
    assert_eq!(raw.row_count(), 3);
    assert_eq!(cell(&raw, 1, columns::INTEREST_RATE), &Value::Utf8("0.45".to_string()));

    let ds = normalize(Entity::FinancialProduct, &raw);
    assert_eq!(ds.schema.fields.len(), 4);
    assert_eq!(cell(&ds, 0, columns::PRODUCT_TYPE), &Value::Utf8("DEBIT".to_string()));
    assert_eq!(cell(&ds, 2, columns::PRODUCT_TYPE), &Value::Utf8("INVESTMENT".to_string()));
    assert_eq!(cell(&ds, 1, columns::PRODUCT_NAME), &Value::Utf8("Gold Card".to_string()));
    assert_eq!(cell(&ds, 1, columns::INTEREST_RATE), &Value::Decimal(Decimal::new(45, 2)));
}

#[test]
fn first_sheet_without_product_columns_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("products_master.xlsx");
    write_product_master(&path);

    let out = Extractor::default().extract(&SourceDescriptor::new(&path), &Entity::FinancialProduct.raw_schema());
    assert!(!out.is_available());
    assert!(out.dataset().is_empty());
}

#[test]
fn error_cell_does_not_drop_the_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("products_master.xlsx");

    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    for (col, header) in ["product_id", "product_name", "product_type", "interest_rate"]
        .into_iter()
        .enumerate()
    {
        ws.write_string(0, col as u16, header).unwrap();
    }
    ws.write_string(1, 0, "P01").unwrap();
    ws.write_string(1, 1, "savings account").unwrap();
    ws.write_string(1, 2, "DEBITO").unwrap();
    ws.write_formula(1, 3, Formula::new("=NA()").set_result("#N/A")).unwrap();
    ws.write_string(2, 0, "P02").unwrap();
    ws.write_string(2, 1, "gold card").unwrap();
    ws.write_string(2, 2, "CREDITO").unwrap();
    ws.write_number(2, 3, 0.45).unwrap();
    wb.save(&path).unwrap();

    let out = Extractor::default().extract(&SourceDescriptor::new(&path), &Entity::FinancialProduct.raw_schema());
    assert!(out.is_available());

    let ds = normalize(Entity::FinancialProduct, &out.into_dataset());
    assert_eq!(ds.row_count(), 2);
    assert_eq!(cell(&ds, 0, columns::PRODUCT_ID), &Value::Utf8("P01".to_string()));
    assert_eq!(cell(&ds, 0, columns::INTEREST_RATE), &Value::Null);
    assert_eq!(cell(&ds, 1, columns::INTEREST_RATE), &Value::Decimal(Decimal::new(45, 2)));
}
