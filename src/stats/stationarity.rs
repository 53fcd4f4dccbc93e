//! Augmented Dickey-Fuller stationarity testing
//!
//! The null hypothesis is that the series has a unit root (is non-stationary);
//! a p-value at or below the significance level rejects it. The regression is
//!
//!   dy_t = alpha + beta * y_{t-1} + sum_i gamma_i * dy_{t-i} + e_t
//!
//! and the statistic is the t-ratio of beta. P-values are interpolated
//! between finite-sample critical values for the constant-only case.

use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::table::{is_missing, TimeSeriesTable};

/// Result of an Augmented Dickey-Fuller test on a single series
#[derive(Debug, Clone, Serialize)]
pub struct AdfResult {
    /// t-ratio of the level coefficient
    pub statistic: f64,
    /// Approximate p-value of the statistic
    pub p_value: f64,
    /// Critical values at the 1%, 5% and 10% levels
    pub critical_values: Vec<(String, f64)>,
    /// Whether the null hypothesis is rejected at the requested level
    pub is_stationary: bool,
}

/// Run the Augmented Dickey-Fuller test on a value sequence
///
/// The number of lagged difference terms starts at the common cube-root rule,
/// capped so the regression keeps positive degrees of freedom. Strongly
/// periodic series make the lagged differences collinear and the normal
/// equations singular; the lag order is then reduced step by step until the
/// regression is well conditioned, down to the plain Dickey-Fuller form.
pub fn adf_test(values: &[f64], significance: f64) -> Result<AdfResult> {
    let n = values.len();
    if n < 10 {
        return Err(Error::InsufficientData(format!(
            "ADF test needs at least 10 observations, got {}",
            n
        )));
    }
    if values.iter().any(|v| is_missing(*v)) {
        return Err(Error::InsufficientData(
            "ADF test requires a complete series".to_string(),
        ));
    }

    let diff: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    let mut lag = (((n as f64).powf(1.0 / 3.0) * 2.0) as usize)
        .min(n / 4)
        .max(1);

    let statistic = loop {
        match adf_statistic(values, &diff, lag) {
            Ok(value) => break value,
            Err(err) => {
                if lag == 0 {
                    return Err(err);
                }
                debug!("ADF regression at lag {} failed ({}), retrying", lag, err);
                lag -= 1;
            }
        }
    };

    // finite-sample adjusted critical values for the constant-only case
    let cv_1 = -3.43 - 6.0 / n as f64;
    let cv_5 = -2.86 - 4.0 / n as f64;
    let cv_10 = -2.57 - 3.0 / n as f64;

    let p_value = interpolate_p_value(statistic, cv_1, cv_5, cv_10);

    Ok(AdfResult {
        statistic,
        p_value,
        critical_values: vec![
            ("1%".to_string(), cv_1),
            ("5%".to_string(), cv_5),
            ("10%".to_string(), cv_10),
        ],
        is_stationary: p_value <= significance,
    })
}

/// t-ratio of the level coefficient at a fixed lag order
fn adf_statistic(values: &[f64], diff: &[f64], lag: usize) -> Result<f64> {
    let n = values.len();
    let effective_n = n - 1 - lag;
    let num_regressors = 2 + lag;
    if effective_n <= num_regressors {
        return Err(Error::InsufficientData(format!(
            "ADF regression has {} observations for {} regressors",
            effective_n, num_regressors
        )));
    }

    // regressor rows: [1, y_{t-1}, dy_{t-1}, ..., dy_{t-lag}]
    let mut x = Vec::with_capacity(effective_n);
    for t in lag..diff.len() {
        let mut row = Vec::with_capacity(num_regressors);
        row.push(1.0);
        row.push(values[t]);
        for i in 1..=lag {
            row.push(diff[t - i]);
        }
        x.push(row);
    }
    let y: Vec<f64> = diff[lag..].to_vec();

    // OLS through the normal equations
    let xtx = gram_matrix(&x, num_regressors);
    let xty = gram_vector(&x, &y, num_regressors);
    let xtx_inv = invert_matrix(&xtx)?;

    let mut beta = vec![0.0; num_regressors];
    for i in 0..num_regressors {
        for j in 0..num_regressors {
            beta[i] += xtx_inv[i][j] * xty[j];
        }
    }

    let mut sse = 0.0;
    for (row, &yt) in x.iter().zip(&y) {
        let fitted: f64 = row.iter().zip(&beta).map(|(a, b)| a * b).sum();
        sse += (yt - fitted).powi(2);
    }
    let mse = sse / (effective_n - num_regressors) as f64;
    let se_level = (mse * xtx_inv[1][1]).sqrt();

    if !se_level.is_finite() || se_level <= 0.0 {
        return Err(Error::Computation(
            "ADF regression produced a degenerate standard error".to_string(),
        ));
    }

    Ok(beta[1] / se_level)
}

/// Piecewise interpolation of the p-value between critical values
fn interpolate_p_value(statistic: f64, cv_1: f64, cv_5: f64, cv_10: f64) -> f64 {
    if statistic < cv_1 {
        0.01 / (cv_1 - statistic).exp()
    } else if statistic < cv_5 {
        0.01 + (0.05 - 0.01) * (statistic - cv_1) / (cv_5 - cv_1)
    } else if statistic < cv_10 {
        0.05 + (0.10 - 0.05) * (statistic - cv_5) / (cv_10 - cv_5)
    } else {
        0.10 + 0.90 * (1.0 - (-0.5 * (statistic - cv_10)).exp())
    }
}

fn gram_matrix(x: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
    let mut result = vec![vec![0.0; k]; k];
    for row in x {
        for i in 0..k {
            for j in 0..k {
                result[i][j] += row[i] * row[j];
            }
        }
    }
    result
}

fn gram_vector(x: &[Vec<f64>], y: &[f64], k: usize) -> Vec<f64> {
    let mut result = vec![0.0; k];
    for (row, &yt) in x.iter().zip(y) {
        for i in 0..k {
            result[i] += row[i] * yt;
        }
    }
    result
}

/// Invert a square matrix by Gauss-Jordan elimination with partial pivoting
fn invert_matrix(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let n = matrix.len();

    // augmented matrix [A | I]
    let mut augmented: Vec<Vec<f64>> = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut extended = row.clone();
            extended.extend((0..n).map(|j| if i == j { 1.0 } else { 0.0 }));
            extended
        })
        .collect();

    for i in 0..n {
        let mut pivot_row = i;
        let mut pivot_value = augmented[i][i].abs();
        for j in i + 1..n {
            if augmented[j][i].abs() > pivot_value {
                pivot_row = j;
                pivot_value = augmented[j][i].abs();
            }
        }

        if pivot_value < 1e-10 {
            return Err(Error::Computation(
                "singular matrix in ADF regression".to_string(),
            ));
        }
        if pivot_row != i {
            augmented.swap(i, pivot_row);
        }

        let pivot = augmented[i][i];
        for value in augmented[i].iter_mut() {
            *value /= pivot;
        }

        for j in 0..n {
            if j != i {
                let factor = augmented[j][i];
                for k in 0..2 * n {
                    augmented[j][k] -= factor * augmented[i][k];
                }
            }
        }
    }

    Ok(augmented
        .into_iter()
        .map(|row| row[n..].to_vec())
        .collect())
}

/// One row of the stationarity report
#[derive(Debug, Clone, Serialize)]
pub struct StationarityRow {
    /// Tested column
    pub column: String,
    /// Human-readable verdict
    pub verdict: String,
    /// ADF statistic
    pub statistic: f64,
    /// Approximate p-value
    pub p_value: f64,
    /// Critical values at the 1%, 5% and 10% levels
    pub critical_values: Vec<(String, f64)>,
    /// Whether the column is stationary at the requested level
    pub is_stationary: bool,
}

/// Stationarity verdicts for every column whose test converged
#[derive(Debug, Clone, Serialize)]
pub struct StationarityReport {
    /// One row per successfully tested column
    pub rows: Vec<StationarityRow>,
    /// Significance level the verdicts were decided at
    pub significance: f64,
}

impl StationarityReport {
    /// Names of the columns judged stationary
    pub fn stationary_columns(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|row| row.is_stationary)
            .map(|row| row.column.clone())
            .collect()
    }

    /// The modeling feature list: the target first, then stationary columns
    ///
    /// The target is force-included regardless of its own verdict (the date
    /// index is carried by the table itself).
    pub fn selected_columns(&self, target: &str) -> Vec<String> {
        let mut selected = vec![target.to_string()];
        for name in self.stationary_columns() {
            if name != target {
                selected.push(name);
            }
        }
        selected
    }
}

/// Test each candidate column independently
///
/// Columns whose test fails to converge (constant series, insufficient
/// observations) are skipped with a warning rather than aborting the run.
pub fn stationarity_report(
    table: &TimeSeriesTable,
    columns: &[String],
    significance: f64,
) -> Result<StationarityReport> {
    let series: Vec<(&String, &[f64])> = columns
        .iter()
        .map(|name| table.column(name).map(|values| (name, values)))
        .collect::<Result<_>>()?;

    let rows: Vec<StationarityRow> = series
        .par_iter()
        .filter_map(|(name, values)| match adf_test(values, significance) {
            Ok(result) => Some(StationarityRow {
                column: (*name).clone(),
                verdict: verdict_text(result.is_stationary),
                statistic: result.statistic,
                p_value: result.p_value,
                critical_values: result.critical_values,
                is_stationary: result.is_stationary,
            }),
            Err(err) => {
                warn!("ADF test skipped column '{}': {}", name, err);
                None
            }
        })
        .collect();

    Ok(StationarityReport { rows, significance })
}

fn verdict_text(is_stationary: bool) -> String {
    if is_stationary {
        "rejects the null hypothesis (H0): the series is stationary".to_string()
    } else {
        "fails to reject the null hypothesis (H0): the series is non-stationary".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oscillating_series(n: usize) -> Vec<f64> {
        (0..n).map(|i| (i as f64 * 0.9).sin() * 5.0).collect()
    }

    fn random_walk(n: usize) -> Vec<f64> {
        let mut data = vec![0.0];
        for i in 1..n {
            data.push(data[i - 1] + (i as f64 * 0.1).sin() * 0.1 + 0.05);
        }
        data
    }

    #[test]
    fn test_adf_rejects_for_oscillating_series() {
        let result = adf_test(&oscillating_series(200), 0.05).unwrap();
        assert!(result.statistic < -3.5);
        assert!(result.p_value <= 0.05);
        assert!(result.is_stationary);
    }

    #[test]
    fn test_adf_handles_collinear_lagged_differences() {
        // an exactly periodic series satisfies a low-order linear recurrence,
        // so the full-order regression is singular and the lag must shrink
        let periodic: Vec<f64> = (0..160)
            .map(|i| (std::f64::consts::PI * i as f64 / 4.0).sin() * 5.0 + 10.0)
            .collect();

        let result = adf_test(&periodic, 0.05).unwrap();
        assert!(result.statistic < -3.5);
        assert!(result.is_stationary);
    }

    #[test]
    fn test_adf_does_not_reject_for_random_walk() {
        let result = adf_test(&random_walk(200), 0.05).unwrap();
        assert!(result.statistic > -2.5);
        assert!(!result.is_stationary);
    }

    #[test]
    fn test_adf_is_deterministic() {
        let data = oscillating_series(120);
        let a = adf_test(&data, 0.05).unwrap();
        let b = adf_test(&data, 0.05).unwrap();
        assert_eq!(a.statistic, b.statistic);
        assert_eq!(a.p_value, b.p_value);
        assert_eq!(a.is_stationary, b.is_stationary);
    }

    #[test]
    fn test_adf_rejects_short_series() {
        let result = adf_test(&[1.0, 2.0, 3.0], 0.05);
        assert!(matches!(result, Err(Error::InsufficientData(_))));
    }

    #[test]
    fn test_adf_constant_series_fails_to_converge() {
        let result = adf_test(&vec![3.0; 50], 0.05);
        assert!(result.is_err());
    }

    #[test]
    fn test_report_skips_failed_columns() {
        use chrono::NaiveDate;

        let n = 100;
        let dates: Vec<NaiveDate> = (0..n)
            .map(|i| {
                NaiveDate::from_ymd_opt(2000 + (i / 12) as i32, (i % 12 + 1) as u32, 1).unwrap()
            })
            .collect();
        let table = TimeSeriesTable::new(
            dates,
            "precio_leche",
            vec![
                ("precio_leche".to_string(), oscillating_series(n)),
                ("constante".to_string(), vec![1.0; n]),
            ],
        )
        .unwrap();

        let report = stationarity_report(
            &table,
            &["precio_leche".to_string(), "constante".to_string()],
            0.05,
        )
        .unwrap();

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].column, "precio_leche");
        assert!(report.rows[0].is_stationary);
    }

    #[test]
    fn test_selected_columns_force_include_target() {
        let report = StationarityReport {
            rows: vec![StationarityRow {
                column: "pib_lagged_1".to_string(),
                verdict: verdict_text(true),
                statistic: -4.0,
                p_value: 0.01,
                critical_values: vec![],
                is_stationary: true,
            }],
            significance: 0.05,
        };

        let selected = report.selected_columns("precio_leche");
        assert_eq!(
            selected,
            vec!["precio_leche".to_string(), "pib_lagged_1".to_string()]
        );
    }
}
