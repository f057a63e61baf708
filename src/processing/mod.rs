//! In-memory data transformations.
//!
//! The processing layer operates on [`crate::types::DataSet`] values produced by ingestion.
//!
//! - [`split()`]: row partitioning by predicate
//! - [`map_into()`]: row mapping into a new schema
//! - [`normalize`]: the per-entity transformer built on top of them
//!
//! ## Example: normalize raw customers
//!
//! ```rust
//! use finance_etl::domain::Entity;
//! use finance_etl::processing::normalize_customers;
//! use finance_etl::types::{DataSet, Value};
//!
//! let raw = DataSet::new(
//!     Entity::Customer.raw_schema(),
//!     vec![vec![
//!         Value::Utf8(" c0001 ".to_string()),
//!         Value::Utf8("Ana".to_string()),
//!         Value::Utf8("ANA@MAIL.COM".to_string()),
//!         Value::Null,
//!         Value::Utf8("junior".to_string()),
//!     ]],
//! );
//!
//! let out = normalize_customers(&raw);
//! assert_eq!(out.rows[0][0], Value::Utf8("C0001".to_string()));
//! assert_eq!(out.rows[0][2], Value::Utf8("ana@mail.com".to_string()));
//! assert_eq!(out.rows[0][4], Value::Utf8("JUNIOR".to_string()));
//! ```

pub mod filter;
pub mod map;
pub mod normalize;

pub use filter::split;
pub use map::map_into;
pub use normalize::{coerced_columns, normalize, normalize_customers, normalize_products, normalize_transactions, normalized_schema};
