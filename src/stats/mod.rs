//! Statistical tests over table columns

pub mod stationarity;

pub use stationarity::{
    adf_test, stationarity_report, AdfResult, StationarityReport, StationarityRow,
};
