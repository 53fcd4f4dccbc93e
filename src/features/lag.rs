//! Lag features: shifted past-value copies of columns

use log::debug;

use crate::error::Result;
use crate::features::{ColumnSpec, TransformKind};
use crate::table::TimeSeriesTable;

/// Append one lagged copy of each origin column at the given offset
///
/// The derived value at row `i` is the origin value at row `i - offset`
/// under the table's current row order; the first `offset` rows are missing.
/// Returns the names of the columns that were added.
pub fn add_lagged(
    table: &mut TimeSeriesTable,
    columns: &[String],
    offset: usize,
) -> Result<Vec<String>> {
    let mut added = Vec::with_capacity(columns.len());

    for origin in columns {
        let values = table.column(origin)?;
        let mut shifted = vec![f64::NAN; values.len()];
        for i in offset..values.len() {
            shifted[i] = values[i - offset];
        }

        let name = ColumnSpec::new(origin.clone(), TransformKind::Lag(offset)).column_name();
        table.add_column(name.clone(), shifted)?;
        added.push(name);
    }

    debug!("lag {}: added {} columns", offset, added.len());
    Ok(added)
}

/// Append lagged copies at every offset from 1 up to `max_lag` inclusive
pub fn add_lags_up_to(
    table: &mut TimeSeriesTable,
    columns: &[String],
    max_lag: usize,
) -> Result<Vec<String>> {
    let mut added = Vec::new();
    for offset in 1..=max_lag {
        added.extend(add_lagged(table, columns, offset)?);
    }
    Ok(added)
}
