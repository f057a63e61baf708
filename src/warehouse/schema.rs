//! Warehouse tables and their DDL.

use std::fmt;

use serde::Serialize;

use crate::domain::{columns, Entity};

/// A warehouse table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Customers,
    Products,
    Transactions,
}

impl Table {
    /// Tables ordered children first (safe order for deletes).
    pub const DELETE_ORDER: [Table; 3] = [Table::Transactions, Table::Products, Table::Customers];

    pub fn name(self) -> &'static str {
        match self {
            Table::Customers => "customers",
            Table::Products => "products",
            Table::Transactions => "transactions",
        }
    }

    /// Loadable columns, in DDL order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Customers => &[
                columns::CUSTOMER_ID,
                columns::NAME,
                columns::EMAIL,
                columns::REGISTRATION_DATE,
                columns::SEGMENT,
            ],
            Table::Products => &[columns::PRODUCT_ID, columns::PRODUCT_NAME, columns::PRODUCT_TYPE],
            Table::Transactions => &[
                columns::TRANSACTION_ID,
                columns::CUSTOMER_ID,
                columns::PRODUCT_ID,
                columns::AMOUNT,
                columns::TRANSACTION_DATE,
                columns::MOVEMENT_TYPE,
            ],
        }
    }

    pub fn has_column(self, column: &str) -> bool {
        self.columns().contains(&column)
    }

    pub fn entity(self) -> Entity {
        match self {
            Table::Customers => Entity::Customer,
            Table::Products => Entity::FinancialProduct,
            Table::Transactions => Entity::Transaction,
        }
    }

    pub fn for_entity(entity: Entity) -> Self {
        match entity {
            Entity::Customer => Table::Customers,
            Entity::FinancialProduct => Table::Products,
            Entity::Transaction => Table::Transactions,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Idempotent table provisioning.
pub(crate) const DDL: &str = "
CREATE TABLE IF NOT EXISTS customers (
    customer_id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    email TEXT UNIQUE,
    registration_date TEXT DEFAULT CURRENT_DATE,
    segment TEXT
);

CREATE TABLE IF NOT EXISTS products (
    product_id TEXT PRIMARY KEY NOT NULL,
    product_name TEXT NOT NULL,
    product_type TEXT CHECK (product_type IN ('CREDIT', 'DEBIT', 'INVESTMENT'))
);

CREATE TABLE IF NOT EXISTS transactions (
    transaction_id TEXT PRIMARY KEY NOT NULL,
    customer_id TEXT REFERENCES customers(customer_id),
    product_id TEXT REFERENCES products(product_id),
    amount NUMERIC NOT NULL CHECK (amount <> 0),
    transaction_date TEXT DEFAULT CURRENT_TIMESTAMP,
    movement_type TEXT CHECK (movement_type IN ('INFLOW', 'OUTFLOW'))
);

CREATE INDEX IF NOT EXISTS idx_transactions_customer ON transactions(customer_id);
CREATE INDEX IF NOT EXISTS idx_transactions_product ON transactions(product_id);
";
