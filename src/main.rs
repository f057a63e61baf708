use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use finance_etl::config::PipelineConfig;
use finance_etl::logging::init_logging;
use finance_etl::pipeline::run_pipeline;

/// Run the customers / products / transactions ETL into the SQLite warehouse.
#[derive(Parser, Debug)]
#[command(name = "finance-etl", version, about = "Batch ETL for financial records into SQLite")]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long, env = "FINANCE_ETL_CONFIG")]
    config: Option<PathBuf>,

    /// Override warehouse.path
    #[arg(long, env = "FINANCE_ETL_WAREHOUSE")]
    warehouse: Option<PathBuf>,

    /// Override quarantine.dir
    #[arg(long, env = "FINANCE_ETL_QUARANTINE_DIR")]
    quarantine_dir: Option<PathBuf>,

    /// Override logging.dir
    #[arg(long, env = "FINANCE_ETL_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Override warehouse.batch_size
    #[arg(long, env = "FINANCE_ETL_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(path) = &self.warehouse {
            config.warehouse.path = path.clone();
        }
        if let Some(dir) = &self.quarantine_dir {
            config.quarantine.dir = dir.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.logging.dir = Some(dir.clone());
        }
        if let Some(n) = self.batch_size {
            config.warehouse.batch_size = n;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let _guard = init_logging(&config.logging);
    info!(warehouse = %config.warehouse.path.display(), "starting run");

    let report = run_pipeline(&config).context("pipeline could not start")?;
    println!("{}", report.metrics);

    if let Some(path) = &cli.report {
        let json = report.to_json().context("failed to serialize run report")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}
