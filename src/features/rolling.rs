//! Rolling-window statistics
//!
//! Trailing windows of exactly W consecutive rows ending at the current row.
//! The first W-1 rows of every derived column are missing, and a missing
//! value anywhere inside the window makes the result missing; the window
//! never looks past the current row.

use log::debug;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::features::{ColumnSpec, TransformKind};
use crate::table::{is_missing, TimeSeriesTable};

/// Append trailing-window mean and sample standard deviation columns
///
/// The standard deviation uses the Bessel correction (divide by W-1), so the
/// window must hold at least two rows.
pub fn add_simple_stats(
    table: &mut TimeSeriesTable,
    columns: &[String],
    window: usize,
) -> Result<Vec<String>> {
    if window < 2 {
        return Err(Error::InvalidConfig(format!(
            "rolling mean/std window must be at least 2, got {}",
            window
        )));
    }

    let derived = compute_pairs(table, columns, window, |w| (window_mean(w), window_std(w)))?;

    let mut added = Vec::with_capacity(columns.len() * 2);
    for (origin, (mean_values, std_values)) in columns.iter().zip(derived) {
        let mean_name =
            ColumnSpec::new(origin.clone(), TransformKind::RollingMean(window)).column_name();
        table.add_column(mean_name.clone(), mean_values)?;
        added.push(mean_name);

        let std_name =
            ColumnSpec::new(origin.clone(), TransformKind::RollingStd(window)).column_name();
        table.add_column(std_name.clone(), std_values)?;
        added.push(std_name);
    }

    debug!("rolling mean/std {}: added {} columns", window, added.len());
    Ok(added)
}

/// Append trailing-window excess kurtosis and skewness columns
///
/// Both use the standard unbiased moment-based estimators, which require at
/// least four rows in the window.
pub fn add_distribution_stats(
    table: &mut TimeSeriesTable,
    columns: &[String],
    window: usize,
) -> Result<Vec<String>> {
    if window < 4 {
        return Err(Error::InvalidConfig(format!(
            "rolling kurtosis/skew window must be at least 4, got {}",
            window
        )));
    }

    let derived = compute_pairs(table, columns, window, |w| {
        (window_kurtosis(w), window_skewness(w))
    })?;

    let mut added = Vec::with_capacity(columns.len() * 2);
    for (origin, (kurt_values, skew_values)) in columns.iter().zip(derived) {
        let kurt_name =
            ColumnSpec::new(origin.clone(), TransformKind::RollingKurt(window)).column_name();
        table.add_column(kurt_name.clone(), kurt_values)?;
        added.push(kurt_name);

        let skew_name =
            ColumnSpec::new(origin.clone(), TransformKind::RollingSkew(window)).column_name();
        table.add_column(skew_name.clone(), skew_values)?;
        added.push(skew_name);
    }

    debug!(
        "rolling kurt/skew {}: added {} columns",
        window,
        added.len()
    );
    Ok(added)
}

/// Slide the window over each origin column, producing a pair of series
///
/// Columns are independent, so they are mapped with rayon; the results come
/// back in input order and are merged into the table on the caller's thread.
fn compute_pairs<F>(
    table: &TimeSeriesTable,
    columns: &[String],
    window: usize,
    stats: F,
) -> Result<Vec<(Vec<f64>, Vec<f64>)>>
where
    F: Fn(&[f64]) -> (f64, f64) + Sync,
{
    let sources: Vec<&[f64]> = columns
        .iter()
        .map(|name| table.column(name))
        .collect::<Result<_>>()?;

    Ok(sources
        .par_iter()
        .map(|values| {
            let n = values.len();
            let mut first = Vec::with_capacity(n);
            let mut second = Vec::with_capacity(n);

            for i in 0..n {
                let (a, b) = if i + 1 < window {
                    // insufficient window history
                    (f64::NAN, f64::NAN)
                } else {
                    let slice = &values[i + 1 - window..=i];
                    if slice.iter().any(|v| is_missing(*v)) {
                        (f64::NAN, f64::NAN)
                    } else {
                        stats(slice)
                    }
                };
                first.push(a);
                second.push(b);
            }

            (first, second)
        })
        .collect())
}

fn window_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation with Bessel correction
fn window_std(values: &[f64]) -> f64 {
    let n = values.len();
    let mean = window_mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    variance.sqrt()
}

/// Unbiased sample skewness
///
/// g1 adjusted: n / ((n-1)(n-2)) * sum(((x - mean) / s)^3)
fn window_skewness(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let s = window_std(values);
    if s == 0.0 {
        return f64::NAN;
    }
    let mean = window_mean(values);
    let m3: f64 = values.iter().map(|v| ((v - mean) / s).powi(3)).sum();
    n / ((n - 1.0) * (n - 2.0)) * m3
}

/// Unbiased excess kurtosis
///
/// G2: n(n+1) / ((n-1)(n-2)(n-3)) * sum(((x - mean) / s)^4)
///     - 3 (n-1)^2 / ((n-2)(n-3))
fn window_kurtosis(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let s = window_std(values);
    if s == 0.0 {
        return f64::NAN;
    }
    let mean = window_mean(values);
    let m4: f64 = values.iter().map(|v| ((v - mean) / s).powi(4)).sum();
    n * (n + 1.0) / ((n - 1.0) * (n - 2.0) * (n - 3.0)) * m4
        - 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0))
}
