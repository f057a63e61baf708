//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is built once at startup (TOML file, then command-line overrides),
//! validated, and passed by reference to every stage.
//!
//! ```
//! use finance_etl::config::PipelineConfig;
//!
//! let config: PipelineConfig = toml::from_str(
//!     r#"
//!     [warehouse]
//!     path = "out/warehouse.db"
//!     batch_size = 250
//!
//!     [sources.products]
//!     path = "data/raw/products_master.xlsx"
//!     sheet = "master"
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.warehouse.batch_size, 250);
//! assert_eq!(config.sources.customers.path.to_str(), Some("data/raw/customers_raw.csv"));
//! config.validate().unwrap();
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::Entity;
use crate::error::ConfigError;
use crate::ingestion::SourceDescriptor;

/// Complete configuration of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub warehouse: WarehouseConfig,
    pub sources: SourcesConfig,
    pub quarantine: QuarantineConfig,
    pub logging: LoggingConfig,
}

/// SQLite warehouse settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Database file; parent directories are created on open.
    pub path: PathBuf,
    /// Rows per insert transaction.
    pub batch_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/warehouse.db"),
            batch_size: 1000,
        }
    }
}

/// Raw source locations, one per entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub customers: SourceDescriptor,
    pub products: SourceDescriptor,
    pub transactions: SourceDescriptor,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            customers: SourceDescriptor::new("data/raw/customers_raw.csv"),
            products: SourceDescriptor::new("data/raw/products_master.xlsx"),
            transactions: SourceDescriptor::new("data/raw/transactions_raw.json"),
        }
    }
}

impl SourcesConfig {
    pub fn for_entity(&self, entity: Entity) -> &SourceDescriptor {
        match entity {
            Entity::Customer => &self.customers,
            Entity::FinancialProduct => &self.products,
            Entity::Transaction => &self.transactions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarantineConfig {
    /// Directory receiving `<entity>_rejected_<run_id>.csv` files.
    pub dir: PathBuf,
}

impl Default for QuarantineConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/error"),
        }
    }
}

/// Log output settings. `RUST_LOG` takes precedence over `filter` when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; console only when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// `EnvFilter` directive, e.g. `info` or `finance_etl=debug`.
    pub filter: String,
    /// Write the log file as JSON lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: Some(PathBuf::from("logs")),
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl PipelineConfig {
    /// Read a TOML configuration file. Missing sections and keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read `path` if given, otherwise start from defaults. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run can succeed with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.warehouse.batch_size == 0 {
            return Err(ConfigError::Invalid("warehouse.batch_size must be greater than 0".into()));
        }
        if self.warehouse.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("warehouse.path must not be empty".into()));
        }
        for entity in [Entity::Customer, Entity::FinancialProduct, Entity::Transaction] {
            if self.sources.for_entity(entity).path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!("sources.{entity}.path must not be empty")));
            }
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::IngestionFormat;

    #[test]
    fn defaults_follow_data_directory_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.warehouse.batch_size, 1000);
        assert_eq!(config.quarantine.dir, PathBuf::from("data/error"));
        assert_eq!(
            config.sources.products.path,
            PathBuf::from("data/raw/products_master.xlsx")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etl.toml");
        fs::write(
            &path,
            "[sources.transactions]\npath = \"tx.ndjson\"\nformat = \"json\"\n\n[logging]\njson = true\n",
        )
        .unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.sources.transactions.format, Some(IngestionFormat::Json));
        assert!(config.logging.json);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.warehouse, WarehouseConfig::default());
    }

    #[test]
    fn zero_batch_size_is_invalid() {
        let mut config = PipelineConfig::default();
        config.warehouse.batch_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unreadable_and_malformed_files_are_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            PipelineConfig::load(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[warehouse]\nbatch_size = \"many\"\n").unwrap();
        assert!(matches!(
            PipelineConfig::from_file(&bad),
            Err(ConfigError::Parse { path, .. }) if path == bad
        ));
    }
}
