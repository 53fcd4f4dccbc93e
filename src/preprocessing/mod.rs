//! Preprocessing: scaling and missing-value imputation
//!
//! The imputation contract is the scikit-learn pairing the dataset was
//! originally prepared with: min-max scale the predictors to [0, 1], impute
//! with a nan-aware K-nearest-neighbors pass, then map the values back to
//! their original units.

use std::collections::HashMap;

use log::debug;

use crate::error::{Error, Result};
use crate::table::{is_missing, TimeSeriesTable};

/// Scales numeric columns to the [0, 1] range
///
/// Fitted bounds are retained per column so the transform can be inverted
/// after imputation.
pub struct MinMaxScaler {
    /// Fitted (min, max) per column
    bounds: HashMap<String, (f64, f64)>,
    /// Columns the scaler operates on
    columns: Vec<String>,
}

impl MinMaxScaler {
    /// Create a new scaler for the given columns
    pub fn new(columns: Vec<String>) -> Self {
        MinMaxScaler {
            bounds: HashMap::new(),
            columns,
        }
    }

    /// Fit per-column bounds, ignoring missing cells
    pub fn fit(&mut self, table: &TimeSeriesTable) -> Result<()> {
        for name in &self.columns {
            let values = table.column(name)?;
            let observed: Vec<f64> = values.iter().copied().filter(|v| !is_missing(*v)).collect();
            if observed.is_empty() {
                return Err(Error::InsufficientData(format!(
                    "column '{}' has no observed values to fit scaling bounds",
                    name
                )));
            }
            let min = observed.iter().copied().fold(f64::INFINITY, f64::min);
            let max = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            self.bounds.insert(name.clone(), (min, max));
        }
        Ok(())
    }

    /// Scale the fitted columns in place; missing cells stay missing
    pub fn transform(&self, table: &mut TimeSeriesTable) -> Result<()> {
        for name in &self.columns {
            let (min, max) = self.fitted_bounds(name)?;
            let range = max - min;
            let values = table.column_mut(name)?;
            for v in values.iter_mut() {
                if !is_missing(*v) {
                    // constant columns scale to 0 rather than dividing by zero
                    *v = if range == 0.0 { 0.0 } else { (*v - min) / range };
                }
            }
        }
        Ok(())
    }

    /// Map scaled values back to original units
    pub fn inverse_transform(&self, table: &mut TimeSeriesTable) -> Result<()> {
        for name in &self.columns {
            let (min, max) = self.fitted_bounds(name)?;
            let range = max - min;
            let values = table.column_mut(name)?;
            for v in values.iter_mut() {
                if !is_missing(*v) {
                    *v = if range == 0.0 { min } else { *v * range + min };
                }
            }
        }
        Ok(())
    }

    fn fitted_bounds(&self, name: &str) -> Result<(f64, f64)> {
        self.bounds.get(name).copied().ok_or_else(|| {
            Error::Computation(format!("scaler was not fitted for column '{}'", name))
        })
    }
}

/// Nearest-neighbor imputer over normalized feature space
///
/// Distances follow the nan-euclidean convention: only coordinates observed
/// in both rows contribute, and the squared distance is rescaled by
/// n_features / n_valid so rows with sparse overlap are not favored.
pub struct KnnImputer {
    /// Number of neighbor rows to average over
    n_neighbors: usize,
}

impl KnnImputer {
    pub fn new(n_neighbors: usize) -> Result<Self> {
        if n_neighbors == 0 {
            return Err(Error::InvalidConfig(
                "KNN imputation requires at least one neighbor".to_string(),
            ));
        }
        Ok(KnnImputer { n_neighbors })
    }

    /// Fill every missing cell of the given columns in place
    ///
    /// Each missing cell becomes the mean of that coordinate over the K
    /// nearest rows that observe it, ties broken by row order. Columns with
    /// no observed value at all cannot be imputed and are an error; the
    /// coverage filter is expected to have removed them beforehand.
    pub fn impute(&self, table: &mut TimeSeriesTable, columns: &[String]) -> Result<()> {
        let n_rows = table.row_count();
        let n_features = columns.len();
        if n_features == 0 {
            return Ok(());
        }

        // row-major working copy of the selected columns
        let mut matrix = vec![vec![0.0_f64; n_features]; n_rows];
        for (j, name) in columns.iter().enumerate() {
            let values = table.column(name)?;
            if values.iter().all(|v| is_missing(*v)) {
                return Err(Error::InsufficientData(format!(
                    "column '{}' is entirely missing and cannot be imputed",
                    name
                )));
            }
            for (i, v) in values.iter().enumerate() {
                matrix[i][j] = *v;
            }
        }

        let column_means: Vec<f64> = (0..n_features)
            .map(|j| {
                let observed: Vec<f64> = matrix
                    .iter()
                    .map(|row| row[j])
                    .filter(|v| !is_missing(*v))
                    .collect();
                observed.iter().sum::<f64>() / observed.len() as f64
            })
            .collect();

        let mut filled = 0usize;
        let mut result = matrix.clone();

        for i in 0..n_rows {
            let missing_coords: Vec<usize> = (0..n_features)
                .filter(|&j| is_missing(matrix[i][j]))
                .collect();
            if missing_coords.is_empty() {
                continue;
            }

            // candidate rows ordered by nan-euclidean distance, row order
            // breaking ties (the sort is stable)
            let mut candidates: Vec<(usize, f64)> = (0..n_rows)
                .filter(|&k| k != i)
                .filter_map(|k| {
                    nan_euclidean(&matrix[i], &matrix[k], n_features).map(|d| (k, d))
                })
                .collect();
            candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

            for &j in &missing_coords {
                let donors: Vec<f64> = candidates
                    .iter()
                    .filter(|(k, _)| !is_missing(matrix[*k][j]))
                    .take(self.n_neighbors)
                    .map(|(k, _)| matrix[*k][j])
                    .collect();

                result[i][j] = if donors.is_empty() {
                    // no reachable neighbor observes this coordinate
                    column_means[j]
                } else {
                    donors.iter().sum::<f64>() / donors.len() as f64
                };
                filled += 1;
            }
        }

        for (j, name) in columns.iter().enumerate() {
            let values = table.column_mut(name)?;
            for (i, v) in values.iter_mut().enumerate() {
                *v = result[i][j];
            }
        }

        debug!(
            "knn imputation: filled {} cells across {} columns",
            filled, n_features
        );
        Ok(())
    }
}

/// Distance over coordinates observed in both rows
///
/// Returns None when the rows share no observed coordinate.
fn nan_euclidean(a: &[f64], b: &[f64], n_features: usize) -> Option<f64> {
    let mut sum = 0.0;
    let mut valid = 0usize;
    for (x, y) in a.iter().zip(b) {
        if !is_missing(*x) && !is_missing(*y) {
            sum += (x - y).powi(2);
            valid += 1;
        }
    }
    if valid == 0 {
        None
    } else {
        Some((sum * n_features as f64 / valid as f64).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn month(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, m, 1).unwrap()
    }

    fn table(columns: Vec<(String, Vec<f64>)>) -> TimeSeriesTable {
        let target = columns[0].0.clone();
        let rows = columns[0].1.len() as u32;
        TimeSeriesTable::new((1..=rows).map(month).collect(), &target, columns).unwrap()
    }

    #[test]
    fn test_scaler_round_trip() {
        let mut t = table(vec![("pib".to_string(), vec![10.0, 20.0, 30.0, 40.0])]);
        let mut scaler = MinMaxScaler::new(vec!["pib".to_string()]);
        scaler.fit(&t).unwrap();
        scaler.transform(&mut t).unwrap();

        assert_eq!(t.column("pib").unwrap(), &[0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0]);

        scaler.inverse_transform(&mut t).unwrap();
        for (got, want) in t.column("pib").unwrap().iter().zip([10.0, 20.0, 30.0, 40.0]) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_scaler_constant_column() {
        let mut t = table(vec![("pib".to_string(), vec![5.0, 5.0, 5.0])]);
        let mut scaler = MinMaxScaler::new(vec!["pib".to_string()]);
        scaler.fit(&t).unwrap();
        scaler.transform(&mut t).unwrap();
        assert_eq!(t.column("pib").unwrap(), &[0.0, 0.0, 0.0]);

        scaler.inverse_transform(&mut t).unwrap();
        assert_eq!(t.column("pib").unwrap(), &[5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_imputation_fills_all_missing() {
        let mut t = table(vec![
            ("pib".to_string(), vec![1.0, 2.0, f64::NAN, 4.0, 5.0]),
            ("lluvia".to_string(), vec![10.0, 20.0, 30.0, f64::NAN, 50.0]),
        ]);
        let imputer = KnnImputer::new(2).unwrap();
        imputer
            .impute(&mut t, &["pib".to_string(), "lluvia".to_string()])
            .unwrap();

        for name in ["pib", "lluvia"] {
            assert_eq!(t.missing_count(name).unwrap(), 0);
        }
    }

    #[test]
    fn test_imputed_value_is_neighbor_mean() {
        // row 2 is missing 'pib'; its nearest rows by 'lluvia' are rows 1 and 3
        let mut t = table(vec![
            ("lluvia".to_string(), vec![0.0, 9.0, 10.0, 11.0, 100.0]),
            ("pib".to_string(), vec![1.0, 2.0, f64::NAN, 4.0, 5.0]),
        ]);
        let imputer = KnnImputer::new(2).unwrap();
        imputer
            .impute(&mut t, &["lluvia".to_string(), "pib".to_string()])
            .unwrap();

        let pib = t.column("pib").unwrap();
        assert!((pib[2] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_entirely_missing_column_is_an_error() {
        let mut t = table(vec![
            ("pib".to_string(), vec![1.0, 2.0, 3.0]),
            ("vacio".to_string(), vec![f64::NAN, f64::NAN, f64::NAN]),
        ]);
        let imputer = KnnImputer::new(1).unwrap();
        let result = imputer.impute(&mut t, &["pib".to_string(), "vacio".to_string()]);
        assert!(matches!(result, Err(Error::InsufficientData(_))));
    }

    #[test]
    fn test_zero_neighbors_rejected() {
        assert!(matches!(KnnImputer::new(0), Err(Error::InvalidConfig(_))));
    }
}
