//! Descriptive statistics
//!
//! Quantiles use linear interpolation between order statistics at index `q * (n - 1)`.
//! Standard deviations and variances are sample estimates (one delta degree of freedom); with fewer
//! than two values they are reported as zero and flagged.

use crate::error::InsufficientDataError;
use crate::models::{
    AdvancedStatistics, ComputationWarning, DatasetOverview, DistributionShape, DistributionType,
    Distributions, SectionStatus, SpreadSummary, StatSummary, SummaryMetrics, TypeMetrics,
    TypeMetricsSection, VarianceAnalysis,
};
use crate::types::{Dataset, Parameter};

use ndarray::Array1;
use ndarray_stats::{interpolate::Linear, Quantile1dExt, SummaryStatisticsExt};
use noisy_float::types::{n64, R64};
use std::collections::BTreeMap;

/// Skewness magnitude below which a distribution is considered approximately normal.
pub const SKEWNESS_THRESHOLD: f64 = 0.5;

/// Minimum number of values for a sample standard deviation.
const STD_MIN_SAMPLES: usize = 2;

/// Minimum number of values for skewness and kurtosis.
const SHAPE_MIN_SAMPLES: usize = 3;

/// Quartile levels reported by [describe], including the extremes.
const QUARTILES: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Returns whether every value is equal. An empty array is not constant.
pub(crate) fn is_constant(values: &Array1<f64>) -> bool {
    match values.iter().next() {
        Some(first) => values.iter().all(|value| value == first),
        None => false,
    }
}

/// Compute quantiles of a set of values.
///
/// # Arguments
///
/// * `values`: Values. Any non-finite value is an error.
/// * `levels`: Quantile levels in [0, 1]
/// * `subject`: Name of the values, for errors
pub(crate) fn quantiles(
    values: &Array1<f64>,
    levels: &[f64],
    subject: &str,
) -> Result<Vec<f64>, InsufficientDataError> {
    let error = || InsufficientDataError::Quantile {
        subject: subject.to_string(),
    };
    let mut values: Array1<R64> = values
        .iter()
        .map(|value| R64::try_new(*value))
        .collect::<Option<_>>()
        .ok_or_else(error)?;
    levels
        .iter()
        .map(|level| {
            values
                .quantile_mut(n64(*level), &Linear)
                .map(R64::raw)
                .map_err(|_| error())
        })
        .collect()
}

/// Describe one set of values.
///
/// # Arguments
///
/// * `values`: Values, which must all be finite
/// * `subject`: Name of the values, for errors
pub fn describe(values: &Array1<f64>, subject: &str) -> Result<StatSummary, InsufficientDataError> {
    let count = values.len();
    let mean = values
        .mean()
        .ok_or(InsufficientDataError::TooFewRows {
            section: "descriptive statistics",
            rows: 0,
            required: 1,
        })?;
    let q = quantiles(values, &QUARTILES, subject)?;
    let insufficient_data = count < STD_MIN_SAMPLES;
    let std = if insufficient_data {
        0.0
    } else {
        values.std(1.0)
    };
    Ok(StatSummary {
        count,
        mean,
        std,
        min: q[0],
        q25: q[1],
        q50: q[2],
        q75: q[3],
        max: q[4],
        insufficient_data,
    })
}

/// Describe each parameter of a dataset.
fn describe_parameters(
    dataset: &Dataset,
) -> Result<BTreeMap<Parameter, StatSummary>, InsufficientDataError> {
    Parameter::ALL
        .iter()
        .map(|parameter| {
            let summary = describe(&dataset.column(*parameter), &parameter.to_string())?;
            Ok((*parameter, summary))
        })
        .collect()
}

/// Compute dataset-wide descriptive statistics.
#[tracing::instrument(level = "DEBUG", skip_all)]
pub fn summarize(dataset: &Dataset) -> Result<SummaryMetrics, InsufficientDataError> {
    if dataset.is_empty() {
        return Err(InsufficientDataError::TooFewRows {
            section: "summary statistics",
            rows: 0,
            required: 1,
        });
    }
    let overall_stats = describe_parameters(dataset)?;
    let mut warnings = Vec::new();
    let mut statistical_summary = BTreeMap::new();
    for (parameter, summary) in &overall_stats {
        if summary.insufficient_data {
            warnings.push(ComputationWarning::InsufficientSamples {
                subject: format!("{parameter} standard deviation"),
                count: summary.count,
                required: STD_MIN_SAMPLES,
            });
        }
        statistical_summary.insert(
            *parameter,
            SpreadSummary {
                range: summary.max - summary.min,
                iqr: summary.q75 - summary.q25,
            },
        );
    }
    Ok(SummaryMetrics {
        status: SectionStatus::Computed,
        dataset_overview: DatasetOverview {
            total_equipment_count: dataset.len(),
            equipment_types_count: dataset.types().len(),
            parameters: Parameter::ALL.to_vec(),
        },
        overall_stats,
        statistical_summary,
        warnings,
    })
}

/// Compute descriptive statistics independently for each equipment type.
#[tracing::instrument(level = "DEBUG", skip_all)]
pub fn type_metrics(dataset: &Dataset) -> Result<TypeMetricsSection, InsufficientDataError> {
    if dataset.is_empty() {
        return Err(InsufficientDataError::TooFewRows {
            section: "type metrics",
            rows: 0,
            required: 1,
        });
    }
    let types = dataset
        .by_type()
        .into_iter()
        .map(|(equipment_type, group)| {
            let metrics = TypeMetrics {
                count: group.len(),
                parameters: describe_parameters(&group)?,
            };
            Ok((equipment_type, metrics))
        })
        .collect::<Result<_, InsufficientDataError>>()?;
    Ok(TypeMetricsSection {
        status: SectionStatus::Computed,
        types,
    })
}

/// Count records and average each parameter per equipment type.
pub fn distributions(dataset: &Dataset) -> Distributions {
    let mut distributions = Distributions::default();
    for (equipment_type, group) in dataset.by_type() {
        let averages = Parameter::ALL
            .iter()
            .map(|parameter| {
                let column = group.column(*parameter);
                (*parameter, column.sum() / column.len() as f64)
            })
            .collect();
        distributions
            .equipment_types
            .insert(equipment_type.clone(), group.len());
        distributions
            .grouped_averages
            .insert(equipment_type, averages);
    }
    distributions
}

/// Classify a distribution by its skewness.
pub fn classify(skewness: f64) -> DistributionType {
    if skewness.abs() < SKEWNESS_THRESHOLD {
        DistributionType::ApproximatelyNormal
    } else if skewness > 0.0 {
        DistributionType::RightSkewed
    } else {
        DistributionType::LeftSkewed
    }
}

/// Describe the shape of one set of values.
fn shape(
    values: &Array1<f64>,
    parameter: Parameter,
    warnings: &mut Vec<ComputationWarning>,
) -> Result<DistributionShape, InsufficientDataError> {
    if values.len() < SHAPE_MIN_SAMPLES {
        warnings.push(ComputationWarning::InsufficientSamples {
            subject: format!("{parameter} distribution shape"),
            count: values.len(),
            required: SHAPE_MIN_SAMPLES,
        });
        return Ok(DistributionShape {
            insufficient_data: true,
            ..Default::default()
        });
    }
    if is_constant(values) {
        warnings.push(ComputationWarning::ZeroVariance {
            subject: parameter.to_string(),
        });
        return Ok(DistributionShape::default());
    }
    let too_few = |_| InsufficientDataError::TooFewRows {
        section: "advanced statistics",
        rows: values.len(),
        required: SHAPE_MIN_SAMPLES,
    };
    let skewness = values.skewness().map_err(too_few)?;
    let kurtosis = values.kurtosis().map_err(too_few)? - 3.0;
    // Moments of values spread too narrowly to represent underflow.
    if !(skewness.is_finite() && kurtosis.is_finite()) {
        warnings.push(ComputationWarning::ZeroVariance {
            subject: parameter.to_string(),
        });
        return Ok(DistributionShape::default());
    }
    Ok(DistributionShape {
        skewness,
        kurtosis,
        distribution_type: classify(skewness),
        insufficient_data: false,
    })
}

/// Compute the distribution shape and variance of each parameter.
#[tracing::instrument(level = "DEBUG", skip_all)]
pub fn advanced(dataset: &Dataset) -> Result<AdvancedStatistics, InsufficientDataError> {
    if dataset.is_empty() {
        return Err(InsufficientDataError::TooFewRows {
            section: "advanced statistics",
            rows: 0,
            required: 1,
        });
    }
    let mut statistics = AdvancedStatistics::default();
    for parameter in Parameter::ALL {
        let values = dataset.column(parameter);
        let distribution_shape = shape(&values, parameter, &mut statistics.warnings)?;
        let variance = if values.len() < STD_MIN_SAMPLES {
            0.0
        } else {
            values.var(1.0)
        };
        let std = variance.sqrt();
        let mean = values.sum() / values.len() as f64;
        let coefficient_of_variation = Some(std / mean.abs()).filter(|cv| cv.is_finite());
        statistics
            .distribution_shape
            .insert(parameter, distribution_shape);
        statistics.variance_analysis.insert(
            parameter,
            VarianceAnalysis {
                variance,
                std,
                coefficient_of_variation,
            },
        );
    }
    Ok(statistics)
}
