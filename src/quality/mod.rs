//! Data quality: rule evaluation, partitioning and quarantine.
//!
//! [`partition`] is pure. [`Validator`] adds the side effect of writing rejected rows to a
//! [`QuarantineSink`]; a failing sink is logged and never blocks the approved rows.
//!
//! When the raw extract is supplied ([`Validator::validate_with_source`]), quarantined rows also
//! carry a `raw_<column>` text column for every column normalization coerced, so a value that
//! failed to parse is still visible in the quarantine file.

pub mod quarantine;
pub mod rules;

use std::borrow::Cow;
use std::collections::BTreeMap;

use tracing::{error, info, warn};

use crate::domain::{columns, Entity};
use crate::processing::{coerced_columns, split};
use crate::types::{DataSet, DataType, Field, Schema, Value};

pub use quarantine::{CsvQuarantine, MemoryQuarantine, QuarantineSink};
pub use rules::{rules_for, CustomerRules, ProductRules, RejectReason, RowView, RuleSet, TransactionRules};

/// Result of validating one dataset.
///
/// `approved` and `rejected` partition the input exactly, each preserving input order.
/// `rejected` has the input columns plus a trailing `reject_reason` column.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub approved: DataSet,
    pub rejected: DataSet,
}

impl Partition {
    /// Number of rows per reason code. A row with a composite reason counts once per code.
    pub fn reason_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        if let Some(reasons) = self.rejected.column(columns::REJECT_REASON) {
            for code in reasons.filter_map(Value::as_str).flat_map(|s| s.split(';')) {
                *counts.entry(code.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Schema of the rejected side for an input `schema`.
pub fn rejected_schema(schema: &Schema) -> Schema {
    let mut fields = schema.fields.clone();
    fields.push(Field::new(columns::REJECT_REASON, DataType::Utf8));
    Schema::new(fields)
}

/// Split `dataset` by `rules` without side effects.
pub fn partition(rules: &dyn RuleSet, dataset: &DataSet) -> Partition {
    partition_by(dataset, &rules.evaluate(dataset))
}

fn partition_by(dataset: &DataSet, reasons: &[Vec<RejectReason>]) -> Partition {
    let (approved, failed) = split(dataset, |idx, _| reasons[idx].is_empty());

    let mut composite = reasons
        .iter()
        .filter(|r| !r.is_empty())
        .map(|r| RejectReason::join(r));
    let rejected = failed.map_rows_into(rejected_schema(&dataset.schema), |row| {
        let mut out = row.to_vec();
        out.push(composite.next().map_or(Value::Null, Value::Utf8));
        out
    });

    Partition { approved, rejected }
}

/// Applies the entity rule sets and routes rejected rows to a quarantine sink.
pub struct Validator {
    sink: Box<dyn QuarantineSink>,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}

impl Validator {
    pub fn new(sink: impl QuarantineSink + 'static) -> Self {
        Self { sink: Box::new(sink) }
    }

    /// Validate `dataset` with the rules for `entity`.
    pub fn validate(&self, entity: Entity, dataset: &DataSet) -> Partition {
        self.run(rules_for(entity), dataset, None)
    }

    /// Validate `dataset` with an explicit rule set.
    pub fn validate_with(&self, rules: &dyn RuleSet, dataset: &DataSet) -> Partition {
        self.run(rules, dataset, None)
    }

    /// Validate `normalized` with the rules for `entity`, quarantining rejected rows together with
    /// the raw text of their coerced columns.
    ///
    /// `raw` is the dataset `normalized` was produced from; rows are matched by position.
    pub fn validate_with_source(&self, entity: Entity, normalized: &DataSet, raw: &DataSet) -> Partition {
        self.run(rules_for(entity), normalized, Some(raw))
    }

    fn run(&self, rules: &dyn RuleSet, dataset: &DataSet, raw: Option<&DataSet>) -> Partition {
        let entity = rules.entity();
        let reasons = rules.evaluate(dataset);
        let result = partition_by(dataset, &reasons);

        info!(
            entity = %entity,
            approved = result.approved.row_count(),
            rejected = result.rejected.row_count(),
            "validated"
        );

        if !result.rejected.is_empty() {
            warn!(
                entity = %entity,
                rejected = result.rejected.row_count(),
                reasons = ?result.reason_counts(),
                "rows routed to quarantine"
            );
            let quarantined = match raw {
                Some(raw) => Cow::Owned(with_raw_columns(entity, &result.rejected, &reasons, raw)),
                None => Cow::Borrowed(&result.rejected),
            };
            if let Err(err) = self.sink.write(entity, &quarantined) {
                error!(entity = %entity, error = %err, "quarantine write failed");
            }
        }

        result
    }
}

/// Append `raw_<column>` for each coerced column of `entity` found in `raw`.
fn with_raw_columns(entity: Entity, rejected: &DataSet, reasons: &[Vec<RejectReason>], raw: &DataSet) -> DataSet {
    let sources: Vec<(String, usize)> = coerced_columns(entity)
        .into_iter()
        .filter_map(|c| raw.schema.index_of(c).map(|i| (format!("raw_{c}"), i)))
        .collect();

    let mut fields = rejected.schema.fields.clone();
    fields.extend(sources.iter().map(|(name, _)| Field::optional(name.as_str(), DataType::Utf8)));

    let positions = reasons.iter().enumerate().filter(|(_, r)| !r.is_empty()).map(|(i, _)| i);
    let rows = rejected
        .rows
        .iter()
        .zip(positions)
        .map(|(row, pos)| {
            let mut out = row.clone();
            out.extend(sources.iter().map(|&(_, i)| {
                match raw.rows.get(pos).and_then(|r| r.get(i)) {
                    Some(Value::Null) | None => Value::Null,
                    Some(v) => Value::Utf8(v.to_string()),
                }
            }));
            out
        })
        .collect();

    DataSet::new(Schema::new(fields), rows)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::QuarantineError;
    use crate::processing::normalized_schema;

    fn utf8(s: &str) -> Value {
        Value::Utf8(s.to_string())
    }

    fn customers() -> DataSet {
        DataSet::new(
            normalized_schema(Entity::Customer),
            vec![
                vec![utf8("C1"), utf8("Ana"), utf8("ana@x.com"), Value::Null, utf8("PREMIUM")],
                vec![utf8("C2"), utf8("Bo"), utf8("bo.x.com"), Value::Null, Value::Null],
                vec![utf8("C3"), utf8("Cy"), utf8("cy@x.com"), Value::Null, Value::Null],
                vec![utf8("C1"), Value::Null, utf8("dup@x.com"), Value::Null, Value::Null],
            ],
        )
    }

    #[test]
    fn partition_preserves_order_and_appends_reason() {
        let p = partition(&CustomerRules, &customers());

        assert_eq!(p.approved.row_count(), 2);
        assert_eq!(p.approved.rows[0][0], utf8("C1"));
        assert_eq!(p.approved.rows[1][0], utf8("C3"));

        assert_eq!(p.rejected.schema.fields.last().unwrap().name, columns::REJECT_REASON);
        assert_eq!(p.rejected.rows[0][5], utf8("invalid_email"));
        assert_eq!(p.rejected.rows[1][5], utf8("duplicate_id;missing_name"));

        let counts = p.reason_counts();
        assert_eq!(counts["duplicate_id"], 1);
        assert_eq!(counts["missing_name"], 1);
    }

    #[test]
    fn validator_writes_rejected_rows_to_sink() {
        let sink = Arc::new(MemoryQuarantine::new());
        let validator = Validator::new(Arc::clone(&sink));
        let p = validator.validate(Entity::Customer, &customers());

        let quarantined = sink.rejected(Entity::Customer).unwrap();
        assert_eq!(quarantined, p.rejected);
    }

    #[test]
    fn quarantine_keeps_raw_text_of_coerced_columns() {
        let raw = DataSet::new(
            Entity::Transaction.raw_schema(),
            vec![
                vec![utf8("T1"), utf8("C1"), utf8("P01"), utf8("10"), utf8("2024-01-01"), utf8("INFLOW")],
                vec![utf8("T2"), utf8("C1"), utf8("P01"), utf8("abc"), utf8("soon"), utf8("INFLOW")],
            ],
        );
        let normalized = crate::processing::normalize(Entity::Transaction, &raw);

        let sink = Arc::new(MemoryQuarantine::new());
        let p = Validator::new(Arc::clone(&sink)).validate_with_source(Entity::Transaction, &normalized, &raw);
        assert_eq!(p.approved.row_count(), 1);
        assert_eq!(p.rejected.schema.fields.len(), 7);

        let quarantined = sink.rejected(Entity::Transaction).unwrap();
        let names: Vec<&str> = quarantined.schema.field_names().collect();
        assert_eq!(&names[6..], ["reject_reason", "raw_amount", "raw_transaction_date"]);
        assert_eq!(quarantined.rows[0][3], Value::Null);
        assert_eq!(quarantined.rows[0][6], utf8("missing_amount"));
        assert_eq!(quarantined.rows[0][7], utf8("abc"));
        assert_eq!(quarantined.rows[0][8], utf8("soon"));
    }

    struct FailingSink;

    impl QuarantineSink for FailingSink {
        fn write(&self, _: Entity, _: &DataSet) -> Result<(), QuarantineError> {
            Err(QuarantineError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn sink_failure_does_not_block_approved_rows() {
        let p = Validator::new(FailingSink).validate(Entity::Customer, &customers());
        assert_eq!(p.approved.row_count(), 2);
        assert_eq!(p.rejected.row_count(), 2);
    }
}
