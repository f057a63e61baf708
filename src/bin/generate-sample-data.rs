//! Writes a deterministic, intentionally dirty set of raw sources:
//!
//! - `customers_raw.csv`: 100 customers; row 5 repeats `C0001`, row 10 has an email without `@`,
//!   row 15 has an empty name
//! - `products_master.xlsx`: four products with legacy type labels and an extra `interest_rate`
//! - `transactions_raw.json`: 500 transactions; row 0 has amount `-500.00` and one row references
//!   the unknown product `P99`

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_xlsxwriter::Workbook;
use serde_json::{json, Value};

const CUSTOMERS: usize = 100;
const TRANSACTIONS: usize = 500;
const ORPHAN_ROW: usize = 250;

#[derive(Parser, Debug)]
#[command(name = "generate-sample-data", version, about = "Write dirty sample sources for finance-etl")]
struct Cli {
    /// Output directory
    #[arg(long, default_value = "data/raw")]
    out: PathBuf,

    /// Seed for the pseudo-random choices
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn pick<'a, T>(rng: &mut StdRng, items: &'a [T]) -> Result<&'a T> {
    items.choose(rng).context("nothing to choose from")
}

/// Uniform in `[lo, hi)`, rounded to cents.
fn amount(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    (rng.gen_range(lo..hi) * 100.0_f64).round() / 100.0
}

fn customer_id(i: usize) -> String {
    format!("C{i:04}")
}

fn write_customers(path: &Path, rng: &mut StdRng) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    writer.write_record(["customer_id", "name", "email", "registration_date", "segment"])?;

    let start = NaiveDate::from_ymd_opt(2023, 1, 1).context("invalid start date")?;
    for row in 0..CUSTOMERS {
        let n = row + 1;
        let id = if row == 5 { customer_id(1) } else { customer_id(n) };
        let name = if row == 15 { String::new() } else { format!("Customer_{n}") };
        let email = if row == 10 {
            "email_without_at.com".to_string()
        } else {
            format!("customer{n}@email.com")
        };
        let date = (start + Duration::days(row as i64)).format("%Y-%m-%d").to_string();
        let segment = *pick(rng, &["PREMIUM", "REGULAR", "JUNIOR"])?;
        writer.write_record([id.as_str(), name.as_str(), email.as_str(), date.as_str(), segment])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_products(path: &Path) -> Result<()> {
    let products = [
        ("P01", "Savings Account", "DEBITO", 0.01),
        ("P02", "Gold Card", "CREDITO", 0.45),
        ("P03", "Mortgage", "CREDITO", 0.12),
        ("P04", "Investment 365", "INVERSION", 0.11),
    ];

    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("products")?;
    for (col, header) in ["product_id", "product_name", "product_type", "interest_rate"]
        .into_iter()
        .enumerate()
    {
        ws.write_string(0, col as u16, header)?;
    }
    for (i, (id, name, kind, rate)) in products.into_iter().enumerate() {
        let row = i as u32 + 1;
        ws.write_string(row, 0, id)?;
        ws.write_string(row, 1, name)?;
        ws.write_string(row, 2, kind)?;
        ws.write_number(row, 3, rate)?;
    }
    wb.save(path).with_context(|| format!("save {}", path.display()))?;
    Ok(())
}

fn write_transactions(path: &Path, rng: &mut StdRng) -> Result<()> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .context("invalid start timestamp")?;
    let customers: Vec<String> = (1..=CUSTOMERS).map(customer_id).collect();

    let rows = (0..TRANSACTIONS)
        .map(|row| -> Result<Value> {
            let customer = pick(rng, &customers)?.clone();
            let product = if row == ORPHAN_ROW {
                "P99"
            } else {
                *pick(rng, &["P01", "P02", "P03"])?
            };
            let value = if row == 0 { -500.0 } else { amount(rng, 10.0, 5000.0) };
            let when = start + Duration::hours(row as i64);
            Ok(json!({
                "transaction_id": format!("TX{:06}", row + 1),
                "customer_id": customer,
                "product_id": product,
                "amount": value,
                "transaction_date": when.format("%Y-%m-%d %H:%M:%S").to_string(),
                "movement_type": *pick(rng, &["ENTRADA", "SALIDA"])?,
            }))
        })
        .collect::<Result<Vec<Value>>>()?;

    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &rows)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    fs::create_dir_all(&cli.out).with_context(|| format!("create {}", cli.out.display()))?;
    let mut rng = StdRng::seed_from_u64(cli.seed);

    let customers = cli.out.join("customers_raw.csv");
    write_customers(&customers, &mut rng)?;
    println!("wrote {}", customers.display());

    let products = cli.out.join("products_master.xlsx");
    write_products(&products)?;
    println!("wrote {}", products.display());

    let transactions = cli.out.join("transactions_raw.json");
    write_transactions(&transactions, &mut rng)?;
    println!("wrote {}", transactions.display());
    Ok(())
}
