//! Pipeline orchestration
//!
//! Runs the full feature-engineering sequence as a strict linear batch:
//! coverage filter, scaled KNN imputation, date sort, lag generation, rolling
//! statistics, log features, a final missing-row purge, and the stationarity
//! filter that selects the modeling feature set. There is no branching and no
//! rollback; a structural failure in any stage aborts the run.

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::{
    add_distribution_stats, add_lagged, add_log_features, add_simple_stats, filter_columns,
};
use crate::preprocessing::{KnnImputer, MinMaxScaler};
use crate::stats::{stationarity_report, StationarityReport};
use crate::table::TimeSeriesTable;

/// Tunable parameters of the feature pipeline
///
/// The defaults reproduce the historical monthly dairy-price run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Row offsets for lag features
    pub lag_offsets: Vec<usize>,
    /// Window lengths for rolling mean/std
    pub simple_windows: Vec<usize>,
    /// Window lengths for rolling kurtosis/skew
    pub distribution_windows: Vec<usize>,
    /// Maximum tolerated missing percentage per column (0-100)
    pub coverage_threshold: f64,
    /// Significance level for the stationarity verdicts
    pub significance_level: f64,
    /// Neighbor count for KNN imputation
    pub knn_neighbors: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            lag_offsets: vec![1, 4, 12, 24],
            simple_windows: vec![3, 4, 12, 24],
            distribution_windows: vec![12, 24],
            coverage_threshold: 50.0,
            significance_level: 0.05,
            knn_neighbors: 5,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON, filling absent fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| Error::InvalidConfig(format!("configuration JSON: {}", err)))
    }

    /// Validate the parameters before any data is touched
    pub fn validate(&self) -> Result<()> {
        if self.lag_offsets.is_empty() {
            return Err(Error::InvalidConfig("lag offset list is empty".to_string()));
        }
        if self.lag_offsets.contains(&0) {
            return Err(Error::InvalidConfig("lag offsets must be positive".to_string()));
        }
        if self.simple_windows.is_empty() || self.distribution_windows.is_empty() {
            return Err(Error::InvalidConfig("window list is empty".to_string()));
        }
        if let Some(w) = self.simple_windows.iter().find(|w| **w < 2) {
            return Err(Error::InvalidConfig(format!(
                "rolling mean/std window must be at least 2, got {}",
                w
            )));
        }
        if let Some(w) = self.distribution_windows.iter().find(|w| **w < 4) {
            return Err(Error::InvalidConfig(format!(
                "rolling kurtosis/skew window must be at least 4, got {}",
                w
            )));
        }
        if !(0.0..=100.0).contains(&self.coverage_threshold) {
            return Err(Error::InvalidConfig(format!(
                "coverage threshold must be within 0-100, got {}",
                self.coverage_threshold
            )));
        }
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "significance level must be inside (0, 1), got {}",
                self.significance_level
            )));
        }
        if self.knn_neighbors == 0 {
            return Err(Error::InvalidConfig(
                "KNN imputation requires at least one neighbor".to_string(),
            ));
        }
        Ok(())
    }
}

/// Table shape after one pipeline stage
#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    /// Stage name
    pub stage: String,
    /// Row count after the stage
    pub rows: usize,
    /// Column count after the stage (date index not included)
    pub columns: usize,
}

/// Diagnostics collected while the pipeline ran
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Shape after each stage, in execution order
    pub stages: Vec<StageSummary>,
    /// Verdicts of the final stationarity pass
    pub stationarity: StationarityReport,
}

/// The feature-engineering pipeline
pub struct FeaturePipeline {
    config: PipelineConfig,
}

impl FeaturePipeline {
    /// Create a pipeline, validating the configuration up front
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(FeaturePipeline { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full sequence over a cleaned input table
    ///
    /// Returns the final feature table, restricted to the date index, the
    /// target and the stationary feature columns, with no missing values and
    /// rows sorted ascending by date.
    pub fn run(&self, mut table: TimeSeriesTable) -> Result<(TimeSeriesTable, PipelineReport)> {
        let threshold = self.config.coverage_threshold;
        let mut stages = Vec::new();

        info!(
            "feature pipeline start: {} rows, {} columns",
            table.row_count(),
            table.column_count()
        );

        // the target is protected from every filter and is never imputed,
        // so a target with no observations at all must fail here
        if table.missing_count(table.target())? == table.row_count() {
            return Err(Error::InsufficientData(format!(
                "target column '{}' has no observed values",
                table.target()
            )));
        }

        // sparse raw predictors cannot be imputed meaningfully
        filter_columns(&mut table, threshold)?;
        record(&mut stages, "initial coverage filter", &table);

        let predictors = table.predictor_columns();
        if !predictors.is_empty() {
            let mut scaler = MinMaxScaler::new(predictors.clone());
            scaler.fit(&table)?;
            scaler.transform(&mut table)?;
            KnnImputer::new(self.config.knn_neighbors)?.impute(&mut table, &predictors)?;
            scaler.inverse_transform(&mut table)?;
        }
        record(&mut stages, "scaled knn imputation", &table);

        table.sort_by_date();

        // the working set for every derived feature: target plus predictors
        let base_columns: Vec<String> = table.column_names().to_vec();

        for &offset in &self.config.lag_offsets {
            add_lagged(&mut table, &base_columns, offset)?;
        }
        filter_columns(&mut table, threshold)?;
        record(&mut stages, "lag features", &table);

        for &window in &self.config.simple_windows {
            add_simple_stats(&mut table, &base_columns, window)?;
        }
        filter_columns(&mut table, threshold)?;
        record(&mut stages, "rolling mean/std", &table);

        for &window in &self.config.distribution_windows {
            add_distribution_stats(&mut table, &base_columns, window)?;
        }
        add_log_features(&mut table, &base_columns)?;
        filter_columns(&mut table, threshold)?;
        record(&mut stages, "rolling kurt/skew and log", &table);

        table.drop_missing_rows();
        record(&mut stages, "drop incomplete rows", &table);

        let candidates: Vec<String> = table.column_names().to_vec();
        let report =
            stationarity_report(&table, &candidates, self.config.significance_level)?;

        let selected = report.selected_columns(table.target());
        table.select_columns(&selected);
        record(&mut stages, "stationarity selection", &table);

        info!(
            "feature pipeline done: {} rows, {} columns selected",
            table.row_count(),
            table.column_count()
        );

        Ok((
            table,
            PipelineReport {
                stages,
                stationarity: report,
            },
        ))
    }
}

fn record(stages: &mut Vec<StageSummary>, stage: &str, table: &TimeSeriesTable) {
    stages.push(StageSummary {
        stage: stage.to_string(),
        rows: table.row_count(),
        columns: table.column_count(),
    });
}
