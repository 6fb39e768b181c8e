//! Correlation analysis

use crate::error::InsufficientDataError;
use crate::models::{ComputationWarning, Correlations, KeyCorrelations, SectionStatus};
use crate::statistics::is_constant;
use crate::types::{Dataset, Parameter};

use ndarray::Array1;
use std::collections::BTreeMap;

/// Minimum number of rows for correlation analysis.
const MIN_ROWS: usize = 2;

/// Pearson correlation coefficient of two equally sized sets of values.
///
/// Returns `None` when either set has zero variance, for which the coefficient is undefined, or
/// when the coefficient cannot be represented.
///
/// r = Σ[(xi - x̄)(yi - ȳ)] / sqrt(Σ(xi - x̄)² × Σ(yi - ȳ)²)
pub fn pearson(x: &Array1<f64>, y: &Array1<f64>) -> Option<f64> {
    if x.len() != y.len() || is_constant(x) || is_constant(y) {
        return None;
    }
    let dx = x - x.mean()?;
    let dy = y - y.mean()?;
    let denominator = (dx.dot(&dx) * dy.dot(&dy)).sqrt();
    if denominator == 0.0 {
        return None;
    }
    let r = dx.dot(&dy) / denominator;
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Key of the correlation between a parameter and a one-hot type column.
pub fn type_key(parameter: Parameter, equipment_type: &str) -> String {
    format!("{parameter}-Type_{equipment_type}")
}

/// Correlate a pair, reporting 0 with a warning when the coefficient is undefined.
fn correlate_or_zero(
    x: &Array1<f64>,
    y: &Array1<f64>,
    subject: impl FnOnce() -> String,
    warnings: &mut Vec<ComputationWarning>,
) -> f64 {
    pearson(x, y).unwrap_or_else(|| {
        warnings.push(ComputationWarning::ZeroVariance { subject: subject() });
        0.0
    })
}

/// Correlate the parameters with each other and with one-hot encoded types.
///
/// # Arguments
///
/// * `dataset`: Cleaned dataset with at least two rows
#[tracing::instrument(level = "DEBUG", skip_all)]
pub fn correlate(dataset: &Dataset) -> Result<Correlations, InsufficientDataError> {
    if dataset.len() < MIN_ROWS {
        return Err(InsufficientDataError::TooFewRows {
            section: "correlation",
            rows: dataset.len(),
            required: MIN_ROWS,
        });
    }

    let columns = Parameter::ALL.map(|parameter| dataset.column(parameter));
    let column = |parameter: Parameter| &columns[parameter.index()];
    let mut warnings = Vec::new();

    let mut matrix: BTreeMap<Parameter, BTreeMap<Parameter, f64>> = BTreeMap::new();
    for parameter in Parameter::ALL {
        matrix.entry(parameter).or_default().insert(parameter, 1.0);
    }
    let mut pairs = [0.0; 3];
    for (i, (a, b)) in Parameter::PAIRS.into_iter().enumerate() {
        let r = correlate_or_zero(
            column(a),
            column(b),
            || format!("{a}-{b}"),
            &mut warnings,
        );
        matrix.entry(a).or_default().insert(b, r);
        matrix.entry(b).or_default().insert(a, r);
        pairs[i] = r;
    }

    let mut type_correlations = BTreeMap::new();
    for equipment_type in dataset.types() {
        let indicator: Array1<f64> = dataset
            .records()
            .iter()
            .map(|record| f64::from(u8::from(record.equipment_type == equipment_type)))
            .collect();
        for parameter in Parameter::ALL {
            let key = type_key(parameter, equipment_type);
            let r = correlate_or_zero(column(parameter), &indicator, || key.clone(), &mut warnings);
            type_correlations.insert(key, r);
        }
    }

    Ok(Correlations {
        status: SectionStatus::Computed,
        matrix,
        key_correlations: Some(KeyCorrelations {
            flowrate_pressure: pairs[0],
            flowrate_temperature: pairs[1],
            pressure_temperature: pairs[2],
        }),
        type_correlations,
        warnings,
    })
}
