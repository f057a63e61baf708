//! SQLite warehouse: provisioning, full-refresh reset, chunked loads and confirmed-id reads.
//!
//! Loads never return an error. Each chunk of `batch_size` rows is inserted inside its own
//! transaction; the first failing chunk is rolled back, logged, and ends the load of that table.
//! Earlier chunks stay committed. [`LoadReport`] describes the outcome.

pub mod schema;

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::WarehouseConfig;
use crate::error::WarehouseError;
use crate::types::{DataSet, Value, DATE_FORMAT, TIMESTAMP_FORMAT};

pub use schema::Table;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Utf8(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Decimal(d) => ToSqlOutput::Owned(SqlValue::Text(d.to_string())),
            Value::Date(d) => ToSqlOutput::Owned(SqlValue::Text(d.format(DATE_FORMAT).to_string())),
            Value::Timestamp(ts) => ToSqlOutput::Owned(SqlValue::Text(ts.format(TIMESTAMP_FORMAT).to_string())),
        })
    }
}

/// Why a load stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    /// Zero-based index of the rolled back chunk; `None` when the load was refused up front.
    pub chunk: Option<usize>,
    /// Rows in the rolled back chunk.
    pub rows: usize,
    pub message: String,
}

/// Outcome of [`Warehouse::load`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub table: Table,
    pub attempted: usize,
    pub committed: usize,
    pub failure: Option<LoadFailure>,
}

impl LoadReport {
    fn new(table: Table, attempted: usize) -> Self {
        Self {
            table,
            attempted,
            committed: 0,
            failure: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// A single SQLite connection owned by the pipeline.
#[derive(Debug)]
pub struct Warehouse {
    conn: Connection,
    batch_size: usize,
}

impl Warehouse {
    /// Open (or create) the warehouse file and provision its tables.
    ///
    /// Every failure here is a [`WarehouseError::Setup`].
    pub fn open(config: &WarehouseConfig) -> Result<Self, WarehouseError> {
        let path = config.path.as_path();
        let setup = |message: String| WarehouseError::Setup {
            path: path.to_path_buf(),
            message,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| setup(format!("cannot create {}: {e}", parent.display())))?;
        }
        let conn = Connection::open(path).map_err(|e| setup(e.to_string()))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(|e| setup(e.to_string()))?;

        let warehouse = Self::provision(conn, config.batch_size).map_err(|e| setup(e.to_string()))?;
        info!(path = %path.display(), batch_size = config.batch_size, "warehouse ready");
        Ok(warehouse)
    }

    /// Private in-memory warehouse.
    pub fn open_in_memory(batch_size: usize) -> Result<Self, WarehouseError> {
        let conn = Connection::open_in_memory().map_err(|e| WarehouseError::Setup {
            path: PathBuf::from(":memory:"),
            message: e.to_string(),
        })?;
        Self::provision(conn, batch_size).map_err(|e| WarehouseError::Setup {
            path: PathBuf::from(":memory:"),
            message: e.to_string(),
        })
    }

    fn provision(conn: Connection, batch_size: usize) -> rusqlite::Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(schema::DDL)?;
        Ok(Self {
            conn,
            batch_size: batch_size.max(1),
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Borrow the underlying connection (read-only inspection).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Delete every row from all tables, children first, atomically.
    pub fn reset_schema(&mut self) -> Result<(), WarehouseError> {
        let tx = self.conn.transaction()?;
        for table in Table::DELETE_ORDER {
            let deleted = tx.execute(&format!("DELETE FROM {}", table.name()), [])?;
            debug!(table = %table, deleted, "table cleared");
        }
        tx.commit()?;
        info!("warehouse reset");
        Ok(())
    }

    /// Distinct non-null values of `column` as currently stored. Read fresh on every call.
    pub fn confirmed_ids(&self, table: Table, column: &str) -> Result<HashSet<String>, WarehouseError> {
        if !table.has_column(column) {
            return Err(WarehouseError::UnknownColumn {
                table: table.name().to_string(),
                column: column.to_string(),
            });
        }

        let sql = format!(
            "SELECT DISTINCT {column} FROM {table} WHERE {column} IS NOT NULL",
            table = table.name()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|id| id.map(|s| s.trim().to_string()))
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    /// `COUNT(*)` of `table`.
    pub fn row_count(&self, table: Table) -> Result<usize, WarehouseError> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table.name()), [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Insert `dataset` into `table` in chunks of `batch_size` rows.
    pub fn load(&mut self, dataset: &DataSet, table: Table) -> LoadReport {
        let mut report = LoadReport::new(table, dataset.row_count());

        if let Some(column) = dataset.schema.field_names().find(|c| !table.has_column(c)) {
            let err = WarehouseError::UnknownColumn {
                table: table.name().to_string(),
                column: column.to_string(),
            };
            error!(table = %table, error = %err, "load refused");
            report.failure = Some(LoadFailure {
                chunk: None,
                rows: 0,
                message: err.to_string(),
            });
            return report;
        }
        if dataset.is_empty() {
            info!(table = %table, "nothing to load");
            return report;
        }

        let sql = insert_sql(table, dataset);
        for (chunk, rows) in dataset.rows.chunks(self.batch_size).enumerate() {
            match insert_chunk(&mut self.conn, &sql, rows) {
                Ok(()) => {
                    report.committed += rows.len();
                    debug!(table = %table, chunk, rows = rows.len(), "chunk committed");
                }
                Err(err) => {
                    error!(
                        table = %table,
                        chunk,
                        chunk_rows = rows.len(),
                        committed = report.committed,
                        attempted = report.attempted,
                        error = %err,
                        "chunk rolled back; load stopped"
                    );
                    report.failure = Some(LoadFailure {
                        chunk: Some(chunk),
                        rows: rows.len(),
                        message: err.to_string(),
                    });
                    return report;
                }
            }
        }

        info!(table = %table, committed = report.committed, "load complete");
        report
    }
}

fn insert_sql(table: Table, dataset: &DataSet) -> String {
    let names: Vec<&str> = dataset.schema.field_names().collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name(),
        names.join(", "),
        placeholders.join(", ")
    )
}

fn insert_chunk(conn: &mut Connection, sql: &str, rows: &[Vec<Value>]) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(sql)?;
        for row in rows {
            stmt.execute(params_from_iter(row.iter()))?;
        }
    }
    tx.commit()
}
