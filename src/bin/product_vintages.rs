//! Print one product's vintage grid for a single metric
//!
//! Rows are origination quarters, columns calendar quarters.

use anyhow::{anyhow, Context, Result};
use bank_plan::calendar::HORIZON_QUARTERS;
use bank_plan::{Assumptions, CohortEngine, Division, Metric};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "product_vintages", about = "Print a product's triangular vintage grid")]
struct Args {
    /// Division code (RE, SME, PG)
    #[arg(long)]
    division: String,

    /// Product code within the division
    #[arg(long)]
    product: String,

    /// Metric name, e.g. gross_book_value, default, ecl
    #[arg(long, default_value = "gross_book_value")]
    metric: String,

    /// Directory containing the assumption CSV tables
    #[arg(long, default_value = bank_plan::assumptions::loader::DEFAULT_ASSUMPTIONS_PATH)]
    assumptions: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let division: Division = args.division.parse()?;
    let metric = Metric::from_name(&args.metric)
        .ok_or_else(|| anyhow!("Unknown metric: {}", args.metric))?;

    let assumptions = Assumptions::from_csv_path(&args.assumptions)
        .with_context(|| format!("Failed to load assumptions from {}", args.assumptions.display()))?;
    let product = assumptions
        .product(division, &args.product)
        .ok_or_else(|| anyhow!("No product {} in division {}", args.product, division))?;

    let vintages = CohortEngine::new(&assumptions).run_product(product)?;
    let grid = vintages.grid(metric);

    println!("{} {} - {}", vintages.scope(), vintages.name, metric.as_str());
    print!("{:>4}", "v\\q");
    for q in 1..=HORIZON_QUARTERS {
        print!(" {:>9}", q);
    }
    println!();

    for v in 1..=HORIZON_QUARTERS {
        print!("{:>4}", v);
        for q in 1..=HORIZON_QUARTERS {
            if q < v {
                print!(" {:>9}", "");
            } else {
                print!(" {:>9.3}", grid.get(v, q));
            }
        }
        println!();
    }

    print!("{:>4}", "tot");
    for q in 1..=HORIZON_QUARTERS {
        print!(" {:>9.3}", grid.quarter_total(q));
    }
    println!();

    Ok(())
}
