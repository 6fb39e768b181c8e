//! Analysis result schema and API payloads
//!
//! [AnalysisResult] is the contract between the analysis pipeline and its renderers (web
//! dashboard, desktop client and PDF report). Every top-level key is present on every successful
//! run. A section that could not be computed keeps its keys, with empty collections or `null`
//! values, and says why in its `status`.

use crate::config::EfficiencyWeights;
use crate::error::InsufficientDataError;
use crate::types::{EquipmentRecord, Parameter};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::Display;
use time::OffsetDateTime;

/// Version of the [AnalysisResult] schema.
pub const SCHEMA_VERSION: u32 = 1;

/// Whether a section of the analysis was computed.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SectionStatus {
    /// The section holds computed values
    #[default]
    Computed,
    /// The section could not be computed
    Unavailable { reason: String },
}

impl SectionStatus {
    /// Returns an unavailable status carrying the error message as the reason.
    pub fn unavailable(error: &InsufficientDataError) -> Self {
        Self::Unavailable {
            reason: error.to_string(),
        }
    }

    /// Whether the section was computed.
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed)
    }
}

/// Sections of the analysis that may be unavailable.
pub trait Section {
    /// Returns the section in its unavailable state.
    fn unavailable(error: &InsufficientDataError) -> Self;
}

/// A non-fatal numeric edge case recorded in the affected section.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComputationWarning {
    /// A set of values has zero variance
    ZeroVariance { subject: String },
    /// Too few values for a statistic; a neutral value was reported instead
    InsufficientSamples {
        subject: String,
        count: usize,
        required: usize,
    },
    /// A parameter has the same value for every record, so it cannot be normalised
    ZeroRange { parameter: Parameter },
    /// A numeric column has no values at all and was imputed with zero
    ColumnEntirelyMissing { parameter: Parameter },
    /// Values too large in magnitude to analyse were treated as missing
    ValueOutOfRange { parameter: Parameter, count: usize },
}

/// Summary of the ingest and cleaning stage.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CleaningReport {
    /// Data rows in the upload
    pub original_rows: usize,
    /// Rows dropped for having too many missing values
    pub dropped_sparse_rows: usize,
    /// Missing numeric values replaced by the column mean
    pub imputed_values: usize,
    /// Exact duplicate rows removed
    pub duplicates_removed: usize,
    /// Rows in the cleaned dataset
    pub cleaned_rows: usize,
    /// Columns of the cleaned dataset
    pub columns: Vec<String>,
    /// Warnings raised while cleaning
    pub warnings: Vec<ComputationWarning>,
}

/// Descriptive statistics of one set of values.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct StatSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation. Zero when there are fewer than two values.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    #[serde(rename = "median")]
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
    /// Set when there were too few values for the standard deviation.
    pub insufficient_data: bool,
}

/// Size and shape of the dataset.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DatasetOverview {
    pub total_equipment_count: usize,
    pub equipment_types_count: usize,
    pub parameters: Vec<Parameter>,
}

/// Spread of a parameter.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SpreadSummary {
    /// max - min
    pub range: f64,
    /// q75 - q25
    pub iqr: f64,
}

/// Dataset-wide descriptive statistics.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub status: SectionStatus,
    pub dataset_overview: DatasetOverview,
    pub overall_stats: BTreeMap<Parameter, StatSummary>,
    pub statistical_summary: BTreeMap<Parameter, SpreadSummary>,
    pub warnings: Vec<ComputationWarning>,
}

impl Section for SummaryMetrics {
    fn unavailable(error: &InsufficientDataError) -> Self {
        Self {
            status: SectionStatus::unavailable(error),
            ..Default::default()
        }
    }
}

/// Descriptive statistics of one equipment type.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TypeMetrics {
    pub count: usize,
    pub parameters: BTreeMap<Parameter, StatSummary>,
}

/// Descriptive statistics of each equipment type.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TypeMetricsSection {
    pub status: SectionStatus,
    pub types: BTreeMap<String, TypeMetrics>,
}

impl Section for TypeMetricsSection {
    fn unavailable(error: &InsufficientDataError) -> Self {
        Self {
            status: SectionStatus::unavailable(error),
            ..Default::default()
        }
    }
}

/// Type distribution of the dataset.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Distributions {
    /// Number of records of each type
    pub equipment_types: BTreeMap<String, usize>,
    /// Mean of each parameter for each type
    pub grouped_averages: BTreeMap<String, BTreeMap<Parameter, f64>>,
}

/// Categorical description of a distribution's skewness.
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, PartialEq, Serialize)]
pub enum DistributionType {
    #[default]
    #[serde(rename = "approximately normal")]
    #[strum(serialize = "approximately normal")]
    ApproximatelyNormal,
    #[serde(rename = "right-skewed")]
    #[strum(serialize = "right-skewed")]
    RightSkewed,
    #[serde(rename = "left-skewed")]
    #[strum(serialize = "left-skewed")]
    LeftSkewed,
}

/// Shape of a parameter's distribution.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DistributionShape {
    pub skewness: f64,
    /// Excess kurtosis
    pub kurtosis: f64,
    pub distribution_type: DistributionType,
    pub insufficient_data: bool,
}

/// Variance of a parameter.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct VarianceAnalysis {
    /// Sample variance
    pub variance: f64,
    /// Sample standard deviation
    pub std: f64,
    /// std / |mean|, null when the mean is zero or the ratio is not finite
    pub coefficient_of_variation: Option<f64>,
}

/// Distribution shape and variance of each parameter.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AdvancedStatistics {
    pub status: SectionStatus,
    pub distribution_shape: BTreeMap<Parameter, DistributionShape>,
    pub variance_analysis: BTreeMap<Parameter, VarianceAnalysis>,
    pub warnings: Vec<ComputationWarning>,
}

impl Section for AdvancedStatistics {
    fn unavailable(error: &InsufficientDataError) -> Self {
        Self {
            status: SectionStatus::unavailable(error),
            ..Default::default()
        }
    }
}

/// Pearson correlation of each parameter pair.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct KeyCorrelations {
    pub flowrate_pressure: f64,
    pub flowrate_temperature: f64,
    pub pressure_temperature: f64,
}

impl KeyCorrelations {
    /// Returns the pairs with their correlation, in [Parameter::PAIRS] order.
    pub fn pairs(&self) -> [((Parameter, Parameter), f64); 3] {
        [
            (Parameter::PAIRS[0], self.flowrate_pressure),
            (Parameter::PAIRS[1], self.flowrate_temperature),
            (Parameter::PAIRS[2], self.pressure_temperature),
        ]
    }
}

/// Correlation analysis.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Correlations {
    pub status: SectionStatus,
    /// Symmetric parameter correlation matrix with unit diagonal
    pub matrix: BTreeMap<Parameter, BTreeMap<Parameter, f64>>,
    pub key_correlations: Option<KeyCorrelations>,
    /// Correlation of each parameter with each one-hot type column, keyed
    /// `<Parameter>-Type_<type>`
    pub type_correlations: BTreeMap<String, f64>,
    pub warnings: Vec<ComputationWarning>,
}

impl Section for Correlations {
    fn unavailable(error: &InsufficientDataError) -> Self {
        Self {
            status: SectionStatus::unavailable(error),
            ..Default::default()
        }
    }
}

/// A record with its efficiency score and rank.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EfficiencyRecord {
    pub equipment_name: String,
    #[serde(rename = "type")]
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
    pub efficiency_score: f64,
    /// 1 is the most efficient
    pub rank: usize,
}

/// Efficiency rankings.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct EfficiencyRankings {
    /// All records, most efficient first
    pub overall_efficiency: Vec<EfficiencyRecord>,
    /// The least efficient records, least efficient first
    pub least_efficient: Vec<EfficiencyRecord>,
}

/// Efficiency of one equipment type.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TypeEfficiency {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub insufficient_data: bool,
    pub top_performer: EfficiencyRecord,
}

/// Efficiency scoring.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Efficiency {
    pub status: SectionStatus,
    pub rankings: EfficiencyRankings,
    pub by_type: BTreeMap<String, TypeEfficiency>,
    /// Mean score over the dataset
    pub average_score: Option<f64>,
    /// Normalised weights used for the score
    pub weights: EfficiencyWeights,
    pub warnings: Vec<ComputationWarning>,
}

impl Section for Efficiency {
    fn unavailable(error: &InsufficientDataError) -> Self {
        Self {
            status: SectionStatus::unavailable(error),
            ..Default::default()
        }
    }
}

/// A flagged value.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct OutlierEntry {
    pub equipment_name: String,
    #[serde(rename = "type")]
    pub equipment_type: String,
    pub value: f64,
}

/// Outliers of one parameter.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct OutlierReport {
    /// (low, high) bounds; values outside are outliers
    pub normal_range: (f64, f64),
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    /// Total number of outliers
    pub outlier_count: usize,
    pub outlier_percentage: f64,
    /// Outliers in record order, truncated to the display limit
    pub outliers: Vec<OutlierEntry>,
    /// Whether `outliers` was truncated
    pub truncated: bool,
}

/// Outlier detection.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Outliers {
    pub status: SectionStatus,
    pub basic_analysis: BTreeMap<Parameter, OutlierReport>,
    pub display_limit: usize,
}

impl Section for Outliers {
    fn unavailable(error: &InsufficientDataError) -> Self {
        Self {
            status: SectionStatus::unavailable(error),
            ..Default::default()
        }
    }
}

/// Temperature range of high temperature equipment.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TemperatureStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Equipment operating at or above a temperature threshold.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct HighTemperatureAnalysis {
    pub threshold: f64,
    pub count: usize,
    pub total_equipment: usize,
    pub percentage: f64,
    /// null when no equipment is at or above the threshold
    pub temperature_stats: Option<TemperatureStats>,
    pub equipment_list: Vec<EquipmentRecord>,
}

/// Headline figures for the insights view.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct InsightOverview {
    pub total_equipment: usize,
    pub equipment_types: usize,
}

/// Summary of one equipment type.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TypeInsight {
    pub count: usize,
    pub performance_summary: String,
}

/// The most efficient equipment.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct HighPerformanceEquipment {
    pub best_performer: Option<EfficiencyRecord>,
}

/// Synthesised insights and recommendations.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ComprehensiveInsights {
    pub dataset_overview: InsightOverview,
    pub equipment_type_analysis: BTreeMap<String, TypeInsight>,
    pub high_performance_equipment: HighPerformanceEquipment,
    pub recommendations: Vec<String>,
}

/// The full result of analysing one upload.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub schema_version: u32,
    pub dataset_info: CleaningReport,
    pub summary_metrics: SummaryMetrics,
    pub distributions: Distributions,
    pub efficiency: Efficiency,
    pub correlations: Correlations,
    pub outliers: Outliers,
    pub type_metrics: TypeMetricsSection,
    pub advanced_statistics: AdvancedStatistics,
    pub comprehensive_insights: ComprehensiveInsights,
    pub high_temperature_analysis: HighTemperatureAnalysis,
    /// Top records by each parameter, highest first
    pub top_performers: BTreeMap<Parameter, Vec<EquipmentRecord>>,
}

/// Bookkeeping for a stored dataset.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DatasetMeta {
    /// Opaque dataset identifier
    pub id: u64,
    /// User the upload is attributed to
    pub user: String,
    pub filename: String,
    /// Upload size in bytes
    pub file_size: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub upload_date: OffsetDateTime,
    /// Rows in the cleaned dataset
    pub equipment_count: usize,
}

/// A stored analysis together with its bookkeeping.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StoredDataset {
    pub dataset: DatasetMeta,
    pub analysis_results: AnalysisResult,
}

/// Response to an analysis request.
#[derive(Debug, Deserialize, Serialize)]
pub struct AnalysisResponse {
    pub dataset_id: u64,
    pub dataset: DatasetMeta,
    pub analysis_results: AnalysisResult,
}

/// Response to a history request.
#[derive(Debug, Deserialize, Serialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub datasets: Vec<DatasetMeta>,
}
