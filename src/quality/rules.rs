//! Per-entity data quality rules.
//!
//! Every rule that fails for a row is collected; a row with any failure is rejected once with all
//! of its reasons. Duplicate detection keeps the first occurrence of an identifier, and that first
//! occurrence claims the identifier even when it is itself rejected for another reason.

use std::collections::HashSet;
use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{columns, Categorical, Entity, MovementDirection, ProductType, Segment};
use crate::types::{DataSet, Schema, Value};

/// Why a row was quarantined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingId,
    DuplicateId,
    InvalidEmail,
    MissingName,
    UnrecognizedSegment,
    UnrecognizedProductType,
    MissingAmount,
    NonPositiveAmount,
    UnrecognizedMovementType,
}

impl RejectReason {
    /// Stable code written to the quarantine `reject_reason` column.
    pub fn code(self) -> &'static str {
        match self {
            RejectReason::MissingId => "missing_id",
            RejectReason::DuplicateId => "duplicate_id",
            RejectReason::InvalidEmail => "invalid_email",
            RejectReason::MissingName => "missing_name",
            RejectReason::UnrecognizedSegment => "unrecognized_segment",
            RejectReason::UnrecognizedProductType => "unrecognized_product_type",
            RejectReason::MissingAmount => "missing_amount",
            RejectReason::NonPositiveAmount => "non_positive_amount",
            RejectReason::UnrecognizedMovementType => "unrecognized_movement_type",
        }
    }

    /// Join several reasons into the composite quarantine text (`a;b`).
    pub fn join(reasons: &[RejectReason]) -> String {
        reasons.iter().map(|r| r.code()).collect::<Vec<_>>().join(";")
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Name-based view of one row. Columns missing from the schema read as null.
#[derive(Clone, Copy)]
pub struct RowView<'a> {
    schema: &'a Schema,
    values: &'a [Value],
}

impl<'a> RowView<'a> {
    pub fn new(schema: &'a Schema, values: &'a [Value]) -> Self {
        Self { schema, values }
    }

    pub fn get(&self, column: &str) -> &'a Value {
        static NULL: Value = Value::Null;
        self.schema
            .index_of(column)
            .and_then(|i| self.values.get(i))
            .unwrap_or(&NULL)
    }

    /// Text payload of a non-blank string column.
    pub fn text(&self, column: &str) -> Option<&'a str> {
        self.get(column).as_str().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Tracks identifiers already seen in a batch.
#[derive(Debug, Default)]
pub struct SeenIds(HashSet<String>);

impl SeenIds {
    /// Record `id`; returns `true` if it was seen before.
    pub fn is_duplicate(&mut self, id: &str) -> bool {
        !self.0.insert(id.to_string())
    }
}

/// A set of quality rules for one entity.
pub trait RuleSet {
    fn entity(&self) -> Entity;

    /// Reasons `row` fails, in a stable order. Empty means the row is approved.
    fn check(&self, row: RowView<'_>, seen: &mut SeenIds) -> Vec<RejectReason>;

    /// Evaluate every row of `dataset` in order.
    fn evaluate(&self, dataset: &DataSet) -> Vec<Vec<RejectReason>> {
        let mut seen = SeenIds::default();
        dataset
            .rows
            .iter()
            .map(|row| self.check(RowView::new(&dataset.schema, row), &mut seen))
            .collect()
    }
}

fn check_id(row: RowView<'_>, column: &str, seen: &mut SeenIds, out: &mut Vec<RejectReason>) {
    match row.text(column) {
        None => out.push(RejectReason::MissingId),
        Some(id) if seen.is_duplicate(id) => out.push(RejectReason::DuplicateId),
        Some(_) => {}
    }
}

/// Customers: id present and unique, email contains `@`, name present, known segment if given.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerRules;

impl RuleSet for CustomerRules {
    fn entity(&self) -> Entity {
        Entity::Customer
    }

    fn check(&self, row: RowView<'_>, seen: &mut SeenIds) -> Vec<RejectReason> {
        let mut out = Vec::new();
        check_id(row, columns::CUSTOMER_ID, seen, &mut out);

        if !row.text(columns::EMAIL).is_some_and(|e| e.contains('@')) {
            out.push(RejectReason::InvalidEmail);
        }
        if row.text(columns::NAME).is_none() {
            out.push(RejectReason::MissingName);
        }
        if let Some(segment) = row.text(columns::SEGMENT) {
            if !Segment::parse(segment).is_recognized() {
                out.push(RejectReason::UnrecognizedSegment);
            }
        }
        out
    }
}

/// Products: id present and unique, name present, product type in the closed set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductRules;

impl RuleSet for ProductRules {
    fn entity(&self) -> Entity {
        Entity::FinancialProduct
    }

    fn check(&self, row: RowView<'_>, seen: &mut SeenIds) -> Vec<RejectReason> {
        let mut out = Vec::new();
        check_id(row, columns::PRODUCT_ID, seen, &mut out);

        if row.text(columns::PRODUCT_NAME).is_none() {
            out.push(RejectReason::MissingName);
        }
        let recognized = row
            .text(columns::PRODUCT_TYPE)
            .is_some_and(|t| ProductType::parse(t).is_recognized());
        if !recognized {
            out.push(RejectReason::UnrecognizedProductType);
        }
        out
    }
}

/// Transactions: id present and unique, amount present and strictly positive, known direction if
/// given. Foreign keys are not checked here.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionRules;

impl RuleSet for TransactionRules {
    fn entity(&self) -> Entity {
        Entity::Transaction
    }

    fn check(&self, row: RowView<'_>, seen: &mut SeenIds) -> Vec<RejectReason> {
        let mut out = Vec::new();
        check_id(row, columns::TRANSACTION_ID, seen, &mut out);

        match row.get(columns::AMOUNT).as_decimal() {
            None => out.push(RejectReason::MissingAmount),
            Some(a) if a <= Decimal::ZERO => out.push(RejectReason::NonPositiveAmount),
            Some(_) => {}
        }
        if let Some(direction) = row.text(columns::MOVEMENT_TYPE) {
            if !MovementDirection::parse(direction).is_recognized() {
                out.push(RejectReason::UnrecognizedMovementType);
            }
        }
        out
    }
}

/// Rule set used for `entity`.
pub fn rules_for(entity: Entity) -> &'static dyn RuleSet {
    match entity {
        Entity::Customer => &CustomerRules,
        Entity::FinancialProduct => &ProductRules,
        Entity::Transaction => &TransactionRules,
    }
}
