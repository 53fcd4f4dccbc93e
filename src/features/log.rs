//! Log-scaled feature columns

use log::debug;

use crate::error::Result;
use crate::features::{ColumnSpec, TransformKind};
use crate::table::TimeSeriesTable;

/// Append `log_{col} = ln(x) + 1` for each origin column
///
/// This is deliberately ln(x) + 1 and not log1p: the historical feature set
/// was built with this definition and the model was trained against it, so it
/// is preserved as-is. Values at or below zero have no logarithm and become
/// missing cells rather than aborting the stage.
pub fn add_log_features(table: &mut TimeSeriesTable, columns: &[String]) -> Result<Vec<String>> {
    let mut added = Vec::with_capacity(columns.len());

    for origin in columns {
        let values = table.column(origin)?;
        let transformed: Vec<f64> = values
            .iter()
            .map(|&x| if x > 0.0 { x.ln() + 1.0 } else { f64::NAN })
            .collect();

        let name = ColumnSpec::new(origin.clone(), TransformKind::Log).column_name();
        table.add_column(name.clone(), transformed)?;
        added.push(name);
    }

    debug!("log transform: added {} columns", added.len());
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::is_missing;
    use chrono::NaiveDate;

    #[test]
    fn test_log_transform_and_domain() {
        let dates = (1..=4)
            .map(|m| NaiveDate::from_ymd_opt(2021, m, 1).unwrap())
            .collect();
        let mut t = TimeSeriesTable::new(
            dates,
            "precio_leche",
            vec![("precio_leche".to_string(), vec![1.0, std::f64::consts::E, 0.0, -3.0])],
        )
        .unwrap();

        add_log_features(&mut t, &["precio_leche".to_string()]).unwrap();
        let logged = t.column("log_precio_leche").unwrap();

        assert!((logged[0] - 1.0).abs() < 1e-12);
        assert!((logged[1] - 2.0).abs() < 1e-12);
        // non-positive inputs become missing, not errors
        assert!(is_missing(logged[2]));
        assert!(is_missing(logged[3]));
    }

    #[test]
    fn test_log_round_trip() {
        let x = 7.25_f64;
        let y = x.ln() + 1.0;
        assert!(((y - 1.0).exp() - x).abs() < 1e-12);
    }
}
