//! Coverage filtering: drop columns with too many missing values
//!
//! Every expanding stage introduces fresh missing-value patterns (long-window
//! rolling stats in particular), so the filter is recomputed after each one
//! to keep the column set from accumulating always-missing features.

use std::collections::{HashMap, HashSet};

use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::table::TimeSeriesTable;

/// Missing-value percentage per column
#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    /// Column name to percentage of missing rows (0-100)
    pub missing_pct: HashMap<String, f64>,
}

impl CoverageReport {
    /// Columns whose missing percentage is at most the threshold
    pub fn columns_within(&self, threshold: f64) -> Vec<String> {
        let mut names: Vec<String> = self
            .missing_pct
            .iter()
            .filter(|(_, pct)| **pct <= threshold)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

/// Compute the missing-value percentage of every column
pub fn coverage_report(table: &TimeSeriesTable) -> Result<CoverageReport> {
    let rows = table.row_count();
    if rows == 0 {
        return Err(Error::EmptyTable);
    }

    let mut missing_pct = HashMap::with_capacity(table.column_count());
    for name in table.column_names() {
        let missing = table.missing_count(name)?;
        missing_pct.insert(name.clone(), missing as f64 / rows as f64 * 100.0);
    }

    Ok(CoverageReport { missing_pct })
}

/// Drop every column whose missing percentage exceeds the threshold
///
/// The date index and the target column are protected and survive regardless
/// of their own coverage. Returns the names of the dropped columns.
pub fn filter_columns(table: &mut TimeSeriesTable, threshold: f64) -> Result<Vec<String>> {
    let report = coverage_report(table)?;
    let keep: HashSet<String> = report.columns_within(threshold).into_iter().collect();

    let dropped: Vec<String> = table
        .column_names()
        .iter()
        .filter(|name| *name != table.target() && !keep.contains(name.as_str()))
        .cloned()
        .collect();

    table.drop_columns(&dropped);
    debug!(
        "coverage filter at {}%: dropped {} columns, {} remain",
        threshold,
        dropped.len(),
        table.column_count()
    );
    Ok(dropped)
}
