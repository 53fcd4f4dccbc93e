//! Feature generation stages
//!
//! Each stage takes a table and a set of origin columns and appends derived
//! columns, never mutating or removing the originals. Derived column names
//! follow the `{origin}_{kind}_{param}` convention (the log stage prefixes
//! instead, matching the historical dataset layout).

pub mod coverage;
pub mod lag;
pub mod log;
pub mod rolling;

pub use coverage::{coverage_report, filter_columns, CoverageReport};
pub use lag::{add_lagged, add_lags_up_to};
pub use log::add_log_features;
pub use rolling::{add_distribution_stats, add_simple_stats};

/// Kind of derived-feature transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    /// Past value shifted by N rows
    Lag(usize),
    /// Trailing-window arithmetic mean over W rows
    RollingMean(usize),
    /// Trailing-window sample standard deviation over W rows
    RollingStd(usize),
    /// Trailing-window excess kurtosis over W rows
    RollingKurt(usize),
    /// Trailing-window skewness over W rows
    RollingSkew(usize),
    /// Natural logarithm plus one
    Log,
}

/// Descriptor of a derived column: origin column plus transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Name of the column the feature is derived from
    pub origin: String,
    /// Transform applied to the origin
    pub kind: TransformKind,
}

impl ColumnSpec {
    pub fn new(origin: impl Into<String>, kind: TransformKind) -> Self {
        ColumnSpec {
            origin: origin.into(),
            kind,
        }
    }

    /// Derived column name under the `{origin}_{kind}_{param}` convention
    pub fn column_name(&self) -> String {
        match self.kind {
            TransformKind::Lag(n) => format!("{}_lagged_{}", self.origin, n),
            TransformKind::RollingMean(w) => format!("{}_mean_{}", self.origin, w),
            TransformKind::RollingStd(w) => format!("{}_std_{}", self.origin, w),
            TransformKind::RollingKurt(w) => format!("{}_kurt_{}", self.origin, w),
            TransformKind::RollingSkew(w) => format!("{}_skew_{}", self.origin, w),
            TransformKind::Log => format!("log_{}", self.origin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_naming() {
        let spec = ColumnSpec::new("precio_leche", TransformKind::Lag(12));
        assert_eq!(spec.column_name(), "precio_leche_lagged_12");

        let spec = ColumnSpec::new("PIB", TransformKind::RollingMean(3));
        assert_eq!(spec.column_name(), "PIB_mean_3");

        let spec = ColumnSpec::new("PIB", TransformKind::RollingKurt(24));
        assert_eq!(spec.column_name(), "PIB_kurt_24");

        let spec = ColumnSpec::new("precio_leche", TransformKind::Log);
        assert_eq!(spec.column_name(), "log_precio_leche");
    }
}
