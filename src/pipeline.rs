//! The equipment analysis pipeline
//!
//! Runs each stage in order over one cleaned [Dataset]. Only ingest errors abort a run. A section
//! that cannot be computed is logged and emitted in its unavailable state, so every key of
//! [AnalysisResult] is present on every successful run.

use crate::config::AnalysisConfig;
use crate::correlation;
use crate::efficiency;
use crate::error::{IngestError, InsufficientDataError};
use crate::ingest;
use crate::insights::{self, Findings};
use crate::models::{AnalysisResult, CleaningReport, Section, SCHEMA_VERSION};
use crate::outliers;
use crate::statistics;
use crate::types::Dataset;

use tracing::{event, Level};

/// Returns the section, or the section in its unavailable state on error.
fn section<T: Section>(name: &str, result: Result<T, InsufficientDataError>) -> T {
    result.unwrap_or_else(|error| {
        event!(Level::WARN, section = name, %error, "analysis section unavailable");
        T::unavailable(&error)
    })
}

/// Analyse an uploaded CSV file.
///
/// # Arguments
///
/// * `data`: Uploaded file contents
/// * `config`: Analysis thresholds and weights
pub fn analyze(data: &[u8], config: &AnalysisConfig) -> Result<AnalysisResult, IngestError> {
    let (dataset, dataset_info) = ingest::load(data)?;
    Ok(analyze_dataset(&dataset, dataset_info, config))
}

/// Analyse a cleaned dataset.
///
/// # Arguments
///
/// * `dataset`: Cleaned dataset
/// * `dataset_info`: Report of the cleaning that produced the dataset
/// * `config`: Analysis thresholds and weights
#[tracing::instrument(level = "DEBUG", skip_all, fields(rows = dataset.len()))]
pub fn analyze_dataset(
    dataset: &Dataset,
    dataset_info: CleaningReport,
    config: &AnalysisConfig,
) -> AnalysisResult {
    let summary_metrics = section("summary_metrics", statistics::summarize(dataset));
    let distributions = statistics::distributions(dataset);
    let type_metrics = section("type_metrics", statistics::type_metrics(dataset));
    let advanced_statistics = section("advanced_statistics", statistics::advanced(dataset));
    let correlations = section("correlations", correlation::correlate(dataset));
    let efficiency = section(
        "efficiency",
        efficiency::score(
            dataset,
            &config.efficiency_weights,
            config.top_performer_count,
        ),
    );
    let outliers = section(
        "outliers",
        outliers::detect(dataset, config.outlier_display_limit),
    );
    let high_temperature_analysis =
        insights::high_temperature(dataset, config.high_temperature_threshold);
    let top_performers = insights::top_performers(dataset, config.top_performer_count);

    let comprehensive_insights = insights::synthesize(
        &Findings {
            dataset,
            summary_metrics: &summary_metrics,
            correlations: &correlations,
            efficiency: &efficiency,
            outliers: &outliers,
            advanced_statistics: &advanced_statistics,
            high_temperature: &high_temperature_analysis,
        },
        config,
    );

    AnalysisResult {
        schema_version: SCHEMA_VERSION,
        dataset_info,
        summary_metrics,
        distributions,
        efficiency,
        correlations,
        outliers,
        type_metrics,
        advanced_statistics,
        comprehensive_insights,
        high_temperature_analysis,
        top_performers,
    }
}
