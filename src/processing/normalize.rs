//! Per-entity normalization of raw extracted data.
//!
//! Each function is pure: same row count and order out as in, rows are never dropped, and values
//! that cannot be coerced become [`Value::Null`] for the validator to judge. Columns absent from the
//! raw dataset are emitted as null.

use tracing::debug;

use crate::domain::{columns, Categorical, Entity, MovementDirection, ProductType, Segment};
use crate::types::{self, DataSet, DataType, Field, Schema, Value};

use super::map::map_into;

#[derive(Debug, Clone, Copy)]
enum Rule {
    Identifier,
    Email,
    Text,
    TitleText,
    Segment,
    ProductType,
    Movement,
    Date,
    Timestamp,
    Decimal,
}

struct Column {
    name: &'static str,
    rule: Rule,
    required: bool,
}

const fn col(name: &'static str, rule: Rule) -> Column {
    Column {
        name,
        rule,
        required: true,
    }
}

const fn opt(name: &'static str, rule: Rule) -> Column {
    Column {
        name,
        rule,
        required: false,
    }
}

static CUSTOMER: [Column; 5] = [
    col(columns::CUSTOMER_ID, Rule::Identifier),
    col(columns::NAME, Rule::Text),
    col(columns::EMAIL, Rule::Email),
    opt(columns::REGISTRATION_DATE, Rule::Date),
    opt(columns::SEGMENT, Rule::Segment),
];

static PRODUCT: [Column; 4] = [
    col(columns::PRODUCT_ID, Rule::Identifier),
    col(columns::PRODUCT_NAME, Rule::TitleText),
    col(columns::PRODUCT_TYPE, Rule::ProductType),
    opt(columns::INTEREST_RATE, Rule::Decimal),
];

static TRANSACTION: [Column; 6] = [
    col(columns::TRANSACTION_ID, Rule::Identifier),
    col(columns::CUSTOMER_ID, Rule::Identifier),
    col(columns::PRODUCT_ID, Rule::Identifier),
    col(columns::AMOUNT, Rule::Decimal),
    opt(columns::TRANSACTION_DATE, Rule::Timestamp),
    opt(columns::MOVEMENT_TYPE, Rule::Movement),
];

fn layout(entity: Entity) -> &'static [Column] {
    match entity {
        Entity::Customer => &CUSTOMER,
        Entity::FinancialProduct => &PRODUCT,
        Entity::Transaction => &TRANSACTION,
    }
}

impl Rule {
    fn data_type(self) -> DataType {
        match self {
            Rule::Date => DataType::Date,
            Rule::Timestamp => DataType::Timestamp,
            Rule::Decimal => DataType::Decimal,
            _ => DataType::Utf8,
        }
    }

    fn apply(self, raw: &Value) -> Value {
        let text = match raw {
            Value::Null => return Value::Null,
            Value::Utf8(s) => s.trim().to_string(),
            Value::Date(_) | Value::Timestamp(_) | Value::Decimal(_) if self.data_type() != DataType::Utf8 => {
                return coerce_typed(self, raw);
            }
            other => other.to_string(),
        };
        if text.is_empty() {
            return Value::Null;
        }

        match self {
            Rule::Identifier => Value::Utf8(text.to_uppercase()),
            Rule::Email => Value::Utf8(text.to_lowercase()),
            Rule::Text => Value::Utf8(text),
            Rule::TitleText => Value::Utf8(title_case(&text)),
            Rule::Segment => Value::Utf8(Segment::parse(&text).as_str().to_string()),
            Rule::ProductType => Value::Utf8(ProductType::parse(&text).as_str().to_string()),
            Rule::Movement => Value::Utf8(MovementDirection::parse(&text).as_str().to_string()),
            Rule::Date => types::parse_date(&text).map_or(Value::Null, Value::Date),
            Rule::Timestamp => types::parse_timestamp(&text).map_or(Value::Null, Value::Timestamp),
            Rule::Decimal => Value::parse_as(&DataType::Decimal, &text).unwrap_or(Value::Null),
        }
    }
}

/// Values that already carry a typed payload (e.g. from a typed Parquet source).
fn coerce_typed(rule: Rule, raw: &Value) -> Value {
    match (rule, raw) {
        (Rule::Date, Value::Date(_)) | (Rule::Timestamp, Value::Timestamp(_)) | (Rule::Decimal, Value::Decimal(_)) => {
            raw.clone()
        }
        (Rule::Date, Value::Timestamp(ts)) => Value::Date(ts.date()),
        (Rule::Timestamp, Value::Date(d)) => d.and_hms_opt(0, 0, 0).map_or(Value::Null, Value::Timestamp),
        _ => Value::Null,
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Schema produced by [`normalize`] for `entity`.
pub fn normalized_schema(entity: Entity) -> Schema {
    Schema::new(
        layout(entity)
            .iter()
            .map(|c| {
                if c.required {
                    Field::new(c.name, c.rule.data_type())
                } else {
                    Field::optional(c.name, c.rule.data_type())
                }
            })
            .collect(),
    )
}

/// Columns whose raw text is parsed into a typed value (dates, timestamps, decimals). A value
/// that fails to parse is replaced by null, so these are the columns whose raw text is worth
/// keeping for audit.
pub fn coerced_columns(entity: Entity) -> Vec<&'static str> {
    layout(entity)
        .iter()
        .filter(|c| c.rule.data_type() != DataType::Utf8)
        .map(|c| c.name)
        .collect()
}

/// Normalize a raw dataset for `entity`.
///
/// Extra raw columns are dropped; output columns follow [`normalized_schema`].
pub fn normalize(entity: Entity, raw: &DataSet) -> DataSet {
    let columns = layout(entity);
    let sources: Vec<Option<usize>> = columns.iter().map(|c| raw.schema.index_of(c.name)).collect();

    let out = map_into(raw, normalized_schema(entity), |row| {
        columns
            .iter()
            .zip(&sources)
            .map(|(c, idx)| match idx.and_then(|i| row.get(i)) {
                Some(v) => c.rule.apply(v),
                None => Value::Null,
            })
            .collect()
    });

    debug!(entity = %entity, rows = out.row_count(), "normalized");
    out
}

/// Normalize raw customers: ids uppercased, emails lowercased, dates parsed, segments canonical.
pub fn normalize_customers(raw: &DataSet) -> DataSet {
    normalize(Entity::Customer, raw)
}

/// Normalize raw products: ids uppercased, names title-cased, product types canonical.
pub fn normalize_products(raw: &DataSet) -> DataSet {
    normalize(Entity::FinancialProduct, raw)
}

/// Normalize raw transactions: ids uppercased, amounts decimal, timestamps parsed, directions canonical.
pub fn normalize_transactions(raw: &DataSet) -> DataSet {
    normalize(Entity::Transaction, raw)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;

    fn raw(entity: Entity, rows: Vec<Vec<&str>>) -> DataSet {
        let schema = entity.raw_schema();
        let rows = rows
            .into_iter()
            .map(|r| {
                r.into_iter()
                    .map(|s| Value::parse_as(&DataType::Utf8, s).unwrap())
                    .collect()
            })
            .collect();
        DataSet::new(schema, rows)
    }

    fn utf8(s: &str) -> Value {
        Value::Utf8(s.to_string())
    }

    #[test]
    fn customers_are_trimmed_cased_and_typed() {
        let ds = raw(
            Entity::Customer,
            vec![
                vec![" c0001 ", " Ana Ruiz ", " Ana@Mail.COM ", "2023-01-05", "premium"],
                vec!["", "", "", "yesterday", "gold"],
            ],
        );
        let out = normalize_customers(&ds);

        assert_eq!(out.row_count(), 2);
        assert_eq!(
            out.rows[0],
            vec![
                utf8("C0001"),
                utf8("Ana Ruiz"),
                utf8("ana@mail.com"),
                Value::Date(NaiveDate::from_ymd_opt(2023, 1, 5).unwrap()),
                utf8("PREMIUM"),
            ]
        );
        assert_eq!(
            out.rows[1],
            vec![Value::Null, Value::Null, Value::Null, Value::Null, utf8("GOLD")]
        );
    }

    #[test]
    fn products_map_legacy_labels_and_title_case_names() {
        let ds = raw(
            Entity::FinancialProduct,
            vec![vec!["p01", "tarjeta de CREDITO", "credito", "0.25"]],
        );
        let out = normalize_products(&ds);
        assert_eq!(out.rows[0][1], utf8("Tarjeta De Credito"));
        assert_eq!(out.rows[0][2], utf8("CREDIT"));
        assert_eq!(out.rows[0][3], Value::Decimal(Decimal::new(25, 2)));
    }

    #[test]
    fn unparsable_amounts_and_dates_become_null() {
        let ds = raw(
            Entity::Transaction,
            vec![
                vec!["tx000001", "c0001", "p01", "-500.00", "2024-02-01T10:00:00", "salida"],
                vec!["tx000002", "c0002", "p02", "abc", "not a date", "sideways"],
            ],
        );
        let out = normalize_transactions(&ds);

        assert_eq!(out.rows[0][0], utf8("TX000001"));
        assert_eq!(out.rows[0][3], Value::Decimal(Decimal::new(-50000, 2)));
        assert!(matches!(out.rows[0][4], Value::Timestamp(_)));
        assert_eq!(out.rows[0][5], utf8("OUTFLOW"));

        assert_eq!(out.rows[1][3], Value::Null);
        assert_eq!(out.rows[1][4], Value::Null);
        assert_eq!(out.rows[1][5], utf8("SIDEWAYS"));
    }

    #[test]
    fn coerced_columns_are_the_typed_ones() {
        assert_eq!(coerced_columns(Entity::Customer), vec![columns::REGISTRATION_DATE]);
        assert_eq!(coerced_columns(Entity::FinancialProduct), vec![columns::INTEREST_RATE]);
        assert_eq!(
            coerced_columns(Entity::Transaction),
            vec![columns::AMOUNT, columns::TRANSACTION_DATE]
        );
    }

    #[test]
    fn missing_raw_columns_are_emitted_as_null() {
        let schema = Schema::new(vec![Field::new(columns::CUSTOMER_ID, DataType::Utf8)]);
        let ds = DataSet::new(schema, vec![vec![utf8("c1")]]);
        let out = normalize_customers(&ds);

        assert_eq!(out.schema, normalized_schema(Entity::Customer));
        assert_eq!(out.rows[0][0], utf8("C1"));
        assert!(out.rows[0][1..].iter().all(Value::is_null));
    }

    #[test]
    fn extra_raw_columns_are_projected_away() {
        let ds = raw(Entity::FinancialProduct, vec![vec!["P01", "x", "DEBITO", ""]]);
        let out = normalize_products(&ds);
        assert_eq!(out.schema.fields.len(), 4);
        assert_eq!(out.rows[0][3], Value::Null);
    }
}
