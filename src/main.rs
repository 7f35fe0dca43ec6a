//! Bank Plan CLI
//!
//! Runs the industrial plan and writes grids, divisional series and statements

use anyhow::{Context, Result};
use bank_plan::{Assumptions, PlanRunner};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "bank_plan", version, about = "Run the five-year banking industrial plan")]
struct Args {
    /// Directory containing the assumption CSV tables
    #[arg(long, default_value = bank_plan::assumptions::loader::DEFAULT_ASSUMPTIONS_PATH)]
    assumptions: PathBuf,

    /// Use the built-in reference plan instead of reading CSV tables
    #[arg(long, conflicts_with = "assumptions")]
    default_plan: bool,

    /// Output directory
    #[arg(long, short, default_value = "plan_output")]
    output: PathBuf,

    /// Also write the full result as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("Bank Plan v{}", env!("CARGO_PKG_VERSION"));
    println!("================\n");

    let start = Instant::now();
    let assumptions = if args.default_plan {
        Assumptions::default_plan().context("Failed to build reference plan")?
    } else {
        Assumptions::from_csv_path(&args.assumptions).with_context(|| {
            format!("Failed to load assumptions from {}", args.assumptions.display())
        })?
    };
    println!(
        "Loaded {} products across {} divisions in {:?}",
        assumptions.products().count(),
        assumptions.divisions.len(),
        start.elapsed()
    );

    let runner = PlanRunner::with_assumptions(assumptions);
    let run_start = Instant::now();
    let result = runner.run().context("Plan run failed")?;
    println!("Plan computed in {:?}", run_start.elapsed());

    bank_plan::export::write_all(&args.output, &result, args.json)
        .with_context(|| format!("Failed to write output to {}", args.output.display()))?;

    // Annual overview
    println!(
        "\n{:>4} {:>12} {:>12} {:>12} {:>12} {:>10} {:>10}",
        "Year", "NII", "Provisions", "NetProfit", "TotAssets", "CET1", "ROE"
    );
    println!("{}", "-".repeat(80));
    for year in 1..=bank_plan::calendar::PLAN_YEARS as u32 {
        let statements = &result.statements;
        let Some(year_end) = statements.quarter(year * 4) else {
            continue;
        };
        println!(
            "{:>4} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>9.2}% {:>9.2}%",
            year,
            statements.year_total(year, |r| r.net_interest_income),
            statements.year_total(year, |r| r.loan_loss_provisions),
            statements.year_total(year, |r| r.net_profit),
            year_end.total_assets,
            year_end.cet1_ratio * 100.0,
            year_end.roe * 100.0,
        );
    }

    let summary = result.statements.summary();
    println!("\nSummary:");
    println!("  Total Originations: {:.2}", summary.total_originations);
    println!("  Cumulative Net Profit: {:.2}", summary.total_net_profit);
    println!("  Cumulative Dividends: {:.2}", summary.total_dividends);
    println!("  Final Total Assets: {:.2}", summary.final_total_assets);
    println!("  Final CET1 Ratio: {:.2}%", summary.final_cet1_ratio * 100.0);
    println!("  Minimum CET1 Ratio: {:.2}%", summary.min_cet1_ratio * 100.0);
    println!("  Final NPL Ratio: {:.2}%", summary.final_npl_ratio * 100.0);
    println!("  Peak Wholesale Funding: {:.2}", summary.peak_wholesale_funding);
    println!("\nOutput written to: {}", args.output.display());

    Ok(())
}
