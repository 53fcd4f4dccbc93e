//! Date-indexed numeric table
//!
//! The central data structure of the pipeline: an ordered sequence of rows
//! keyed by date, with named floating-point columns aligned by row position.
//! Missing values are represented as `f64::NAN` so that numeric transforms
//! propagate them without special casing.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::error::{Error, Result};

/// Check whether a cell holds a missing value
#[inline]
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// A date-indexed table of floating-point columns
///
/// Invariants:
/// - every column has exactly one value per row
/// - dates are unique; `sort_by_date` makes them strictly increasing
/// - the target column is always present and is never dropped
#[derive(Debug, Clone)]
pub struct TimeSeriesTable {
    /// Row keys, one per row
    dates: Vec<NaiveDate>,
    /// Column values keyed by name
    data: HashMap<String, Vec<f64>>,
    /// Column names in insertion order
    columns: Vec<String>,
    /// Name of the target column (protected, never filtered out)
    target: String,
}

impl TimeSeriesTable {
    /// Create a new table from dates and named columns
    ///
    /// Validates the structural invariants: at least one row, unique dates,
    /// equal column lengths, unique column names, and a present target column.
    pub fn new(
        dates: Vec<NaiveDate>,
        target: &str,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        if dates.is_empty() {
            return Err(Error::EmptyTable);
        }

        let mut seen_dates = HashSet::with_capacity(dates.len());
        for (row, date) in dates.iter().enumerate() {
            if !seen_dates.insert(*date) {
                return Err(Error::DuplicateDate { row, date: *date });
            }
        }

        let row_count = dates.len();
        let mut data = HashMap::with_capacity(columns.len());
        let mut names = Vec::with_capacity(columns.len());

        for (name, values) in columns {
            if values.len() != row_count {
                return Err(Error::InconsistentRowCount {
                    name,
                    expected: row_count,
                    found: values.len(),
                });
            }
            if data.contains_key(&name) {
                return Err(Error::DuplicateColumnName(name));
            }
            names.push(name.clone());
            data.insert(name, values);
        }

        if !data.contains_key(target) {
            return Err(Error::ColumnNotFound(target.to_string()));
        }

        Ok(TimeSeriesTable {
            dates,
            data,
            columns: names,
            target: target.to_string(),
        })
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    /// Number of columns (date not included)
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column names in insertion order
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Name of the target column
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Row keys
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// All column names except the target, in insertion order
    pub fn predictor_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|name| *name != &self.target)
            .cloned()
            .collect()
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    /// Get a column's values
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.data
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Get a column's values mutably
    pub fn column_mut(&mut self, name: &str) -> Result<&mut Vec<f64>> {
        self.data
            .get_mut(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Append a new column
    ///
    /// The name must be unique and the values must match the row count.
    pub fn add_column(&mut self, name: String, values: Vec<f64>) -> Result<()> {
        if self.data.contains_key(&name) {
            return Err(Error::DuplicateColumnName(name));
        }
        if values.len() != self.row_count() {
            return Err(Error::InconsistentRowCount {
                name,
                expected: self.row_count(),
                found: values.len(),
            });
        }
        self.columns.push(name.clone());
        self.data.insert(name, values);
        Ok(())
    }

    /// Count of missing cells in a column
    pub fn missing_count(&self, name: &str) -> Result<usize> {
        Ok(self.column(name)?.iter().filter(|v| is_missing(**v)).count())
    }

    /// Sort rows ascending by date
    ///
    /// Rolling and lag operations are position sensitive, so every windowed
    /// computation requires this ordering first.
    pub fn sort_by_date(&mut self) {
        let mut order: Vec<usize> = (0..self.dates.len()).collect();
        order.sort_by_key(|&i| self.dates[i]);

        self.dates = order.iter().map(|&i| self.dates[i]).collect();
        for values in self.data.values_mut() {
            *values = order.iter().map(|&i| values[i]).collect();
        }
    }

    /// Keep only rows with dates strictly between the two bounds
    pub fn restrict_dates(&mut self, after: NaiveDate, before: NaiveDate) {
        let keep: Vec<bool> = self
            .dates
            .iter()
            .map(|d| *d > after && *d < before)
            .collect();
        self.retain_rows(&keep);
    }

    /// Drop every row that contains at least one missing value
    pub fn drop_missing_rows(&mut self) {
        let keep: Vec<bool> = (0..self.row_count())
            .map(|row| {
                self.columns
                    .iter()
                    .all(|name| !is_missing(self.data[name][row]))
            })
            .collect();
        self.retain_rows(&keep);
    }

    /// Drop the named columns; the target column is never dropped
    pub fn drop_columns(&mut self, names: &[String]) {
        let doomed: HashSet<&String> =
            names.iter().filter(|n| **n != self.target).collect();
        self.columns.retain(|name| !doomed.contains(name));
        for name in doomed {
            self.data.remove(name);
        }
    }

    /// Restrict the table to the named columns, preserving current order
    ///
    /// The target column is always kept. Names not present in the table are
    /// ignored.
    pub fn select_columns(&mut self, names: &[String]) {
        let wanted: HashSet<&String> = names.iter().collect();
        let drop: Vec<String> = self
            .columns
            .iter()
            .filter(|name| *name != &self.target && !wanted.contains(name))
            .cloned()
            .collect();
        self.drop_columns(&drop);
    }

    fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.dates.len());
        self.dates = self
            .dates
            .iter()
            .zip(keep)
            .filter(|(_, k)| **k)
            .map(|(d, _)| *d)
            .collect();
        for values in self.data.values_mut() {
            *values = values
                .iter()
                .zip(keep)
                .filter(|(_, k)| **k)
                .map(|(v, _)| *v)
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_new_validates_lengths() {
        let dates = vec![date(2020, 1), date(2020, 2)];
        let result = TimeSeriesTable::new(
            dates,
            "precio_leche",
            vec![("precio_leche".to_string(), vec![1.0])],
        );
        assert!(matches!(
            result,
            Err(Error::InconsistentRowCount { .. })
        ));
    }

    #[test]
    fn test_new_rejects_duplicate_dates() {
        let dates = vec![date(2020, 1), date(2020, 1)];
        let result = TimeSeriesTable::new(
            dates,
            "precio_leche",
            vec![("precio_leche".to_string(), vec![1.0, 2.0])],
        );
        assert!(matches!(result, Err(Error::DuplicateDate { row: 1, .. })));
    }

    #[test]
    fn test_new_requires_target() {
        let dates = vec![date(2020, 1)];
        let result = TimeSeriesTable::new(
            dates,
            "precio_leche",
            vec![("pib".to_string(), vec![1.0])],
        );
        assert!(matches!(result, Err(Error::ColumnNotFound(_))));
    }

    #[test]
    fn test_sort_by_date_reorders_all_columns() {
        let dates = vec![date(2020, 3), date(2020, 1), date(2020, 2)];
        let mut table = TimeSeriesTable::new(
            dates,
            "precio_leche",
            vec![("precio_leche".to_string(), vec![3.0, 1.0, 2.0])],
        )
        .unwrap();

        table.sort_by_date();

        assert_eq!(table.dates(), &[date(2020, 1), date(2020, 2), date(2020, 3)]);
        assert_eq!(table.column("precio_leche").unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_add_column_rejects_collisions() {
        let dates = vec![date(2020, 1)];
        let mut table = TimeSeriesTable::new(
            dates,
            "precio_leche",
            vec![("precio_leche".to_string(), vec![1.0])],
        )
        .unwrap();

        let result = table.add_column("precio_leche".to_string(), vec![2.0]);
        assert!(matches!(result, Err(Error::DuplicateColumnName(_))));
    }

    #[test]
    fn test_drop_missing_rows() {
        let dates = vec![date(2020, 1), date(2020, 2), date(2020, 3)];
        let mut table = TimeSeriesTable::new(
            dates,
            "precio_leche",
            vec![
                ("precio_leche".to_string(), vec![1.0, 2.0, 3.0]),
                ("pib".to_string(), vec![f64::NAN, 5.0, 6.0]),
            ],
        )
        .unwrap();

        table.drop_missing_rows();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("pib").unwrap(), &[5.0, 6.0]);
    }

    #[test]
    fn test_restrict_dates_is_exclusive() {
        let dates = vec![date(2020, 1), date(2020, 2), date(2020, 3), date(2020, 4)];
        let mut table = TimeSeriesTable::new(
            dates,
            "precio_leche",
            vec![("precio_leche".to_string(), vec![1.0, 2.0, 3.0, 4.0])],
        )
        .unwrap();

        table.restrict_dates(date(2020, 1), date(2020, 4));

        assert_eq!(table.dates(), &[date(2020, 2), date(2020, 3)]);
        assert_eq!(table.column("precio_leche").unwrap(), &[2.0, 3.0]);
    }

    #[test]
    fn test_target_is_never_dropped() {
        let dates = vec![date(2020, 1)];
        let mut table = TimeSeriesTable::new(
            dates,
            "precio_leche",
            vec![
                ("precio_leche".to_string(), vec![1.0]),
                ("pib".to_string(), vec![2.0]),
            ],
        )
        .unwrap();

        table.drop_columns(&["precio_leche".to_string(), "pib".to_string()]);

        assert!(table.has_column("precio_leche"));
        assert!(!table.has_column("pib"));
    }
}
