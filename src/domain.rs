//! Financial entities handled by the pipeline and their closed categorical vocabularies.
//!
//! Categorical columns (customer segment, product type, movement direction) are parsed into
//! closed enums at the normalization boundary. Values outside the vocabulary become an explicit
//! `Unrecognized` variant which the validator routes to quarantine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{DataType, Field, Schema};

/// An entity type flowing through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Customer,
    FinancialProduct,
    Transaction,
}

impl Entity {
    /// Name used for quarantine sinks and log fields.
    pub fn name(self) -> &'static str {
        match self {
            Entity::Customer => "customers",
            Entity::FinancialProduct => "products",
            Entity::Transaction => "transactions",
        }
    }

    /// Primary identifier column.
    pub fn id_column(self) -> &'static str {
        match self {
            Entity::Customer => columns::CUSTOMER_ID,
            Entity::FinancialProduct => columns::PRODUCT_ID,
            Entity::Transaction => columns::TRANSACTION_ID,
        }
    }

    /// Shape expected from a raw source.
    ///
    /// Every column is read as text; type coercion belongs to normalization. Columns that the
    /// warehouse does not strictly need are optional.
    pub fn raw_schema(self) -> Schema {
        use columns::*;

        let fields = match self {
            Entity::Customer => vec![
                Field::new(CUSTOMER_ID, DataType::Utf8),
                Field::new(NAME, DataType::Utf8),
                Field::new(EMAIL, DataType::Utf8),
                Field::optional(REGISTRATION_DATE, DataType::Utf8),
                Field::optional(SEGMENT, DataType::Utf8),
            ],
            Entity::FinancialProduct => vec![
                Field::new(PRODUCT_ID, DataType::Utf8),
                Field::new(PRODUCT_NAME, DataType::Utf8),
                Field::new(PRODUCT_TYPE, DataType::Utf8),
                Field::optional(INTEREST_RATE, DataType::Utf8),
            ],
            Entity::Transaction => vec![
                Field::new(TRANSACTION_ID, DataType::Utf8),
                Field::new(CUSTOMER_ID, DataType::Utf8),
                Field::new(PRODUCT_ID, DataType::Utf8),
                Field::new(AMOUNT, DataType::Utf8),
                Field::optional(TRANSACTION_DATE, DataType::Utf8),
                Field::optional(MOVEMENT_TYPE, DataType::Utf8),
            ],
        };
        Schema::new(fields)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column names shared by sources, datasets and warehouse tables.
pub mod columns {
    pub const CUSTOMER_ID: &str = "customer_id";
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const REGISTRATION_DATE: &str = "registration_date";
    pub const SEGMENT: &str = "segment";

    pub const PRODUCT_ID: &str = "product_id";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const PRODUCT_TYPE: &str = "product_type";
    pub const INTEREST_RATE: &str = "interest_rate";

    pub const TRANSACTION_ID: &str = "transaction_id";
    pub const AMOUNT: &str = "amount";
    pub const TRANSACTION_DATE: &str = "transaction_date";
    pub const MOVEMENT_TYPE: &str = "movement_type";

    /// Column appended to quarantined rows.
    pub const REJECT_REASON: &str = "reject_reason";
}

/// A closed vocabulary parsed from free text.
pub trait Categorical: Sized {
    /// Parse a raw label (case and surrounding whitespace are ignored).
    fn parse(raw: &str) -> Self;

    /// Canonical uppercase label. Unrecognized values return their normalized input.
    fn as_str(&self) -> &str;

    /// `false` for the `Unrecognized` variant.
    fn is_recognized(&self) -> bool;
}

/// Customer segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Premium,
    Regular,
    Junior,
    Unrecognized(String),
}

impl Categorical for Segment {
    fn parse(raw: &str) -> Self {
        let label = raw.trim().to_uppercase();
        match label.as_str() {
            "PREMIUM" => Segment::Premium,
            "REGULAR" => Segment::Regular,
            "JUNIOR" => Segment::Junior,
            _ => Segment::Unrecognized(label),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Segment::Premium => "PREMIUM",
            Segment::Regular => "REGULAR",
            Segment::Junior => "JUNIOR",
            Segment::Unrecognized(label) => label,
        }
    }

    fn is_recognized(&self) -> bool {
        !matches!(self, Segment::Unrecognized(_))
    }
}

/// Financial product family. Spanish labels from legacy product masters are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductType {
    Credit,
    Debit,
    Investment,
    Unrecognized(String),
}

impl ProductType {
    /// Labels accepted by the warehouse `CHECK` constraint.
    pub const CANONICAL: [&'static str; 3] = ["CREDIT", "DEBIT", "INVESTMENT"];
}

impl Categorical for ProductType {
    fn parse(raw: &str) -> Self {
        let label = raw.trim().to_uppercase();
        match label.as_str() {
            "CREDIT" | "CREDITO" | "CRÉDITO" => ProductType::Credit,
            "DEBIT" | "DEBITO" | "DÉBITO" => ProductType::Debit,
            "INVESTMENT" | "INVERSION" | "INVERSIÓN" => ProductType::Investment,
            _ => ProductType::Unrecognized(label),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            ProductType::Credit => "CREDIT",
            ProductType::Debit => "DEBIT",
            ProductType::Investment => "INVESTMENT",
            ProductType::Unrecognized(label) => label,
        }
    }

    fn is_recognized(&self) -> bool {
        !matches!(self, ProductType::Unrecognized(_))
    }
}

/// Direction of money movement for a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovementDirection {
    Inflow,
    Outflow,
    Unrecognized(String),
}

impl MovementDirection {
    /// Labels accepted by the warehouse `CHECK` constraint.
    pub const CANONICAL: [&'static str; 2] = ["INFLOW", "OUTFLOW"];
}

impl Categorical for MovementDirection {
    fn parse(raw: &str) -> Self {
        let label = raw.trim().to_uppercase();
        match label.as_str() {
            "INFLOW" | "ENTRADA" => MovementDirection::Inflow,
            "OUTFLOW" | "SALIDA" => MovementDirection::Outflow,
            _ => MovementDirection::Unrecognized(label),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            MovementDirection::Inflow => "INFLOW",
            MovementDirection::Outflow => "OUTFLOW",
            MovementDirection::Unrecognized(label) => label,
        }
    }

    fn is_recognized(&self) -> bool {
        !matches!(self, MovementDirection::Unrecognized(_))
    }
}
