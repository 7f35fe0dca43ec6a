//! CSV and JSON writers for plan output

use log::info;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::aggregate::{BankTotals, DivisionTotals, MetricTotals};
use crate::calendar::HORIZON_QUARTERS;
use crate::error::Result;
use crate::plan::PlanResult;
use crate::statements::StatementResult;
use crate::vintage::{Metric, ProductVintages};

fn quarter_header(leading: &[&str]) -> Vec<String> {
    leading
        .iter()
        .map(|s| s.to_string())
        .chain((1..=HORIZON_QUARTERS).map(|q| format!("q{}", q)))
        .collect()
}

fn format_values(values: impl IntoIterator<Item = f64>) -> impl Iterator<Item = String> {
    values.into_iter().map(|v| format!("{:.8}", v))
}

/// Write every grid of a product to `<dir>/<DIV>_<CODE>_vintages.csv`
///
/// One row per (metric, vintage) with quarterly columns.
pub fn write_vintage_grids(dir: &Path, product: &ProductVintages) -> Result<PathBuf> {
    let path = dir.join(format!(
        "{}_{}_vintages.csv",
        product.division.as_str(),
        product.code
    ));
    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(quarter_header(&["metric", "vintage"]))?;

    for grid in product.grids.iter() {
        for vintage in 1..=HORIZON_QUARTERS {
            let mut record = vec![grid.metric.as_str().to_string(), vintage.to_string()];
            record.extend(format_values(grid.row(vintage)));
            writer.write_record(&record)?;
        }
    }
    writer.flush()?;
    Ok(path)
}

fn write_totals<W: Write>(writer: &mut csv::Writer<W>, scope: &str, totals: &MetricTotals) -> Result<()> {
    for metric in Metric::ALL {
        let mut record = vec![scope.to_string(), metric.as_str().to_string()];
        record.extend(format_values(totals.series(metric).0));
        writer.write_record(&record)?;
    }
    let mut record = vec![scope.to_string(), "risk_weighted_exposure".to_string()];
    record.extend(format_values(totals.risk_weighted_exposure.0));
    writer.write_record(&record)?;
    Ok(())
}

/// Write divisional and bank series, one row per (scope, metric)
pub fn write_division_series(path: &Path, divisions: &[DivisionTotals], bank: &BankTotals) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(quarter_header(&["scope", "metric"]))?;
    for division in divisions {
        write_totals(&mut writer, division.division.as_str(), &division.totals)?;
    }
    write_totals(&mut writer, "BANK", &bank.totals)?;
    writer.flush()?;
    Ok(())
}

/// Write consolidated line items, one row per line item
pub fn write_statements(path: &Path, statements: &StatementResult) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(quarter_header(&["line_item"]))?;

    let columns: Vec<Vec<(&'static str, f64)>> =
        statements.rows.iter().map(|r| r.line_items()).collect();
    let Some(first) = columns.first() else {
        writer.flush()?;
        return Ok(());
    };

    for (idx, (name, _)) in first.iter().enumerate() {
        let mut record = vec![name.to_string()];
        record.extend(format_values(columns.iter().map(|c| c[idx].1)));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Serialize the whole result as pretty JSON
pub fn write_json(path: &Path, result: &PlanResult) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, result)?;
    Ok(())
}

/// Write the standard output set into `dir`
pub fn write_all(dir: &Path, result: &PlanResult, json: bool) -> Result<()> {
    fs::create_dir_all(dir)?;
    let vintage_dir = dir.join("vintages");
    fs::create_dir_all(&vintage_dir)?;

    for product in &result.products {
        write_vintage_grids(&vintage_dir, product)?;
    }
    write_division_series(&dir.join("division_series.csv"), &result.divisions, &result.bank)?;
    write_statements(&dir.join("statements.csv"), &result.statements)?;
    if json {
        write_json(&dir.join("plan.json"), result)?;
    }
    info!("Plan output written to {}", dir.display());
    Ok(())
}
