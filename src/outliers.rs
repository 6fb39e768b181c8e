//! Outlier detection using the interquartile range (IQR) rule
//!
//! A value is an outlier when it lies outside `[Q1 - 1.5 * IQR, Q3 + 1.5 * IQR]`. Each parameter
//! is checked independently, so one record may be listed under several parameters.

use crate::error::InsufficientDataError;
use crate::models::{OutlierEntry, OutlierReport, Outliers, SectionStatus};
use crate::statistics::quantiles;
use crate::types::{Dataset, Parameter};

use ndarray::Array1;
use std::collections::BTreeMap;

/// Multiple of the IQR beyond the quartiles at which values become outliers.
pub const IQR_FACTOR: f64 = 1.5;

/// Quartiles and normal range of a set of values.
#[derive(Debug, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub low: f64,
    pub high: f64,
}

impl IqrBounds {
    /// Whether a value lies outside the normal range.
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.low || value > self.high
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Compute the IQR bounds of a set of values.
///
/// # Arguments
///
/// * `values`: Values, which must all be finite
/// * `subject`: Name of the values, for errors
pub fn iqr_bounds(
    values: &Array1<f64>,
    subject: &str,
) -> Result<IqrBounds, InsufficientDataError> {
    let q = quantiles(values, &[0.25, 0.75], subject)?;
    let (q1, q3) = (q[0], q[1]);
    let iqr = q3 - q1;
    Ok(IqrBounds {
        q1,
        q3,
        low: q1 - IQR_FACTOR * iqr,
        high: q3 + IQR_FACTOR * iqr,
    })
}

/// Report the outliers of one parameter.
fn report(
    dataset: &Dataset,
    parameter: Parameter,
    display_limit: usize,
) -> Result<OutlierReport, InsufficientDataError> {
    let bounds = iqr_bounds(&dataset.column(parameter), &parameter.to_string())?;
    let mut outliers: Vec<OutlierEntry> = dataset
        .records()
        .iter()
        .filter(|record| bounds.is_outlier(parameter.value_of(record)))
        .map(|record| OutlierEntry {
            equipment_name: record.name.clone(),
            equipment_type: record.equipment_type.clone(),
            value: parameter.value_of(record),
        })
        .collect();
    let outlier_count = outliers.len();
    let truncated = outlier_count > display_limit;
    outliers.truncate(display_limit);
    Ok(OutlierReport {
        normal_range: (bounds.low, bounds.high),
        q1: bounds.q1,
        q3: bounds.q3,
        iqr: bounds.iqr(),
        outlier_count,
        outlier_percentage: outlier_count as f64 * 100.0 / dataset.len() as f64,
        outliers,
        truncated,
    })
}

/// Detect outliers of each parameter.
///
/// # Arguments
///
/// * `dataset`: Cleaned, non-empty dataset
/// * `display_limit`: Maximum number of outliers listed per parameter. The full count is always
///   reported.
#[tracing::instrument(level = "DEBUG", skip(dataset))]
pub fn detect(dataset: &Dataset, display_limit: usize) -> Result<Outliers, InsufficientDataError> {
    if dataset.is_empty() {
        return Err(InsufficientDataError::TooFewRows {
            section: "outlier detection",
            rows: 0,
            required: 1,
        });
    }
    let basic_analysis = Parameter::ALL
        .iter()
        .map(|parameter| Ok((*parameter, report(dataset, *parameter, display_limit)?)))
        .collect::<Result<BTreeMap<_, _>, InsufficientDataError>>()?;
    Ok(Outliers {
        status: SectionStatus::Computed,
        basic_analysis,
        display_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use crate::types::EquipmentRecord;

    use ndarray::array;

    /// Dataset whose flowrates are the given values.
    fn flowrates(values: &[f64]) -> Dataset {
        Dataset::from_records(
            values
                .iter()
                .enumerate()
                .map(|(i, f)| EquipmentRecord::new(&format!("E-{i}"), "Pump", *f, 1.0, 1.0))
                .collect(),
        )
    }

    #[test]
    fn bounds() {
        let values = array![10.0, 12.0, 13.0, 14.0, 15.0, 16.0, 100.0];
        let bounds = iqr_bounds(&values, "foo").unwrap();
        assert_eq!(
            IqrBounds {
                q1: 12.5,
                q3: 15.5,
                low: 8.0,
                high: 20.0
            },
            bounds
        );
        assert!(bounds.is_outlier(100.0));
        assert!(!bounds.is_outlier(8.0));
        assert!(!bounds.is_outlier(20.0));
    }

    #[test]
    fn flags_only_extreme_value() {
        let dataset = flowrates(&[10.0, 12.0, 13.0, 14.0, 15.0, 16.0, 100.0]);
        let outliers = detect(&dataset, 10).unwrap();
        let report = &outliers.basic_analysis[&Parameter::Flowrate];
        assert_eq!((8.0, 20.0), report.normal_range);
        assert_eq!(1, report.outlier_count);
        assert_eq!(
            vec![OutlierEntry {
                equipment_name: "E-6".to_string(),
                equipment_type: "Pump".to_string(),
                value: 100.0
            }],
            report.outliers
        );
        assert!((report.outlier_percentage - 100.0 / 7.0).abs() < 1e-9);
        assert!(!report.truncated);
        // Pressure is constant, so nothing is an outlier.
        assert_eq!(0, outliers.basic_analysis[&Parameter::Pressure].outlier_count);
    }

    #[test]
    fn display_limit_truncates_list_only() {
        let dataset = flowrates(&[-100.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 100.0, 200.0]);
        let outliers = detect(&dataset, 2).unwrap();
        let report = &outliers.basic_analysis[&Parameter::Flowrate];
        assert_eq!(3, report.outlier_count);
        assert_eq!(2, report.outliers.len());
        assert_eq!(-100.0, report.outliers[0].value);
        assert!(report.truncated);
        assert_eq!(2, outliers.display_limit);
    }

    #[test]
    fn reported_per_parameter() {
        let mut records: Vec<EquipmentRecord> = (0..7)
            .map(|i| {
                let offset = i as f64;
                EquipmentRecord::new(&format!("E-{i}"), "Pump", 10.0 + offset, 5.0 + offset, 1.0)
            })
            .collect();
        records.push(EquipmentRecord::new("Odd", "Valve", 500.0, 500.0, 1.0));
        let outliers = detect(&Dataset::from_records(records), 10).unwrap();
        for parameter in [Parameter::Flowrate, Parameter::Pressure] {
            let report = &outliers.basic_analysis[&parameter];
            assert_eq!(1, report.outlier_count);
            assert_eq!("Odd", report.outliers[0].equipment_name);
        }
    }

    #[test]
    fn sample_outliers() {
        let outliers = detect(&test_utils::get_test_dataset(), 10).unwrap();
        let flowrate = &outliers.basic_analysis[&Parameter::Flowrate];
        assert_eq!((72.5, 132.5), flowrate.normal_range);
        assert_eq!("Valve-1", flowrate.outliers[0].equipment_name);
        assert_eq!(1, flowrate.outlier_count);
        assert_eq!(20.0, flowrate.outlier_percentage);
        assert_eq!(0, outliers.basic_analysis[&Parameter::Pressure].outlier_count);
        assert_eq!(0, outliers.basic_analysis[&Parameter::Temperature].outlier_count);
    }
}
