//! milkcast: feature engineering for dairy-price forecasting
//!
//! A batch pipeline that turns a cleaned, date-indexed table of monthly
//! dairy-price, macroeconomic and precipitation series into a modeling
//! feature set. The stages, in order:
//!
//! - coverage filtering of sparse columns
//! - KNN imputation over min-max normalized predictors
//! - lag features at configurable offsets
//! - rolling mean/std and rolling kurtosis/skew windows
//! - log-scaled copies of the working columns
//! - an Augmented Dickey-Fuller stationarity filter over the result
//!
//! The whole run is a deterministic transform over a complete historical
//! table; there is no streaming or incremental mode.

pub mod error;
pub mod features;
pub mod pipeline;
pub mod preprocessing;
pub mod stats;
pub mod table;

// Re-export commonly used types
pub use error::{Error, Result};
pub use features::{ColumnSpec, CoverageReport, TransformKind};
pub use pipeline::{FeaturePipeline, PipelineConfig, PipelineReport, StageSummary};
pub use preprocessing::{KnnImputer, MinMaxScaler};
pub use stats::{AdfResult, StationarityReport, StationarityRow};
pub use table::TimeSeriesTable;

// Export version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
