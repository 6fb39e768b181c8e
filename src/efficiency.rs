//! Efficiency scoring
//!
//! The efficiency score is a dataset-relative composite in [0, 1]:
//!
//! ```text
//! score = w_f * f̂ + w_t * t̂ + w_p * (1 - p̂)
//! ```
//!
//! where `f̂`, `t̂` and `p̂` are the min-max normalised flowrate, temperature and pressure, and the
//! weights sum to one. High flowrate, high temperature and low pressure score highly. A parameter
//! with the same value for every record cannot be normalised and its term gets full credit, so a
//! single record scores exactly 1.0.

use crate::config::EfficiencyWeights;
use crate::error::InsufficientDataError;
use crate::models::{
    ComputationWarning, Efficiency, EfficiencyRankings, EfficiencyRecord, SectionStatus,
    TypeEfficiency,
};
use crate::types::{Dataset, EquipmentRecord, Parameter};

use ndarray::Array1;
use std::collections::BTreeMap;

/// Min-max normalisation of one parameter over a dataset.
struct Normaliser {
    min: f64,
    range: f64,
}

impl Normaliser {
    fn new(values: &Array1<f64>) -> Self {
        let min = values.fold(f64::INFINITY, |acc, value| acc.min(*value));
        let max = values.fold(f64::NEG_INFINITY, |acc, value| acc.max(*value));
        Self {
            min,
            range: max - min,
        }
    }

    fn has_range(&self) -> bool {
        self.range > 0.0
    }

    /// Normalised value in [0, 1], or `None` without a range.
    fn normalise(&self, value: f64) -> Option<f64> {
        self.has_range().then(|| (value - self.min) / self.range)
    }
}

/// Convert a record into a ranked efficiency record.
fn ranked(record: &EquipmentRecord, efficiency_score: f64, rank: usize) -> EfficiencyRecord {
    EfficiencyRecord {
        equipment_name: record.name.clone(),
        equipment_type: record.equipment_type.clone(),
        flowrate: record.flowrate,
        pressure: record.pressure,
        temperature: record.temperature,
        efficiency_score,
        rank,
    }
}

/// Compute the efficiency score of every record.
///
/// Returns scores in record order and any warnings.
pub fn efficiency_scores(
    dataset: &Dataset,
    weights: &EfficiencyWeights,
) -> (Vec<f64>, Vec<ComputationWarning>) {
    if dataset.len() == 1 {
        return (vec![1.0], vec![]);
    }
    let weights = weights.normalised();
    let normalisers = Parameter::ALL.map(|parameter| Normaliser::new(&dataset.column(parameter)));
    let warnings = Parameter::ALL
        .into_iter()
        .filter(|parameter| !normalisers[parameter.index()].has_range())
        .map(|parameter| ComputationWarning::ZeroRange { parameter })
        .collect();
    let term = |record: &EquipmentRecord, parameter: Parameter| {
        normalisers[parameter.index()].normalise(parameter.value_of(record))
    };
    let scores = dataset
        .records()
        .iter()
        .map(|record| {
            let flowrate = term(record, Parameter::Flowrate).unwrap_or(1.0);
            let temperature = term(record, Parameter::Temperature).unwrap_or(1.0);
            let pressure = term(record, Parameter::Pressure).map_or(1.0, |p| 1.0 - p);
            let score = weights.flowrate * flowrate
                + weights.temperature * temperature
                + weights.pressure * pressure;
            score.clamp(0.0, 1.0)
        })
        .collect();
    (scores, warnings)
}

/// Summarise the scores of one equipment type. `records` must be in rank order.
fn type_efficiency(records: &[&EfficiencyRecord]) -> Option<TypeEfficiency> {
    let top_performer = (*records.first()?).clone();
    let scores: Array1<f64> = records.iter().map(|r| r.efficiency_score).collect();
    let insufficient_data = scores.len() < 2;
    Some(TypeEfficiency {
        count: scores.len(),
        mean: scores.mean()?,
        std: if insufficient_data { 0.0 } else { scores.std(1.0) },
        min: scores.fold(f64::INFINITY, |acc, s| acc.min(*s)),
        max: scores.fold(f64::NEG_INFINITY, |acc, s| acc.max(*s)),
        insufficient_data,
        top_performer,
    })
}

/// Score, rank and summarise the efficiency of each record.
///
/// Ranks run from 1 (most efficient) to N by descending score. Ties keep record order.
///
/// # Arguments
///
/// * `dataset`: Cleaned, non-empty dataset
/// * `weights`: Weights of the score terms
/// * `bottom_count`: Length of the least efficient list
#[tracing::instrument(level = "DEBUG", skip(dataset, weights))]
pub fn score(
    dataset: &Dataset,
    weights: &EfficiencyWeights,
    bottom_count: usize,
) -> Result<Efficiency, InsufficientDataError> {
    if dataset.is_empty() {
        return Err(InsufficientDataError::TooFewRows {
            section: "efficiency",
            rows: 0,
            required: 1,
        });
    }
    let (scores, warnings) = efficiency_scores(dataset, weights);

    let mut order: Vec<usize> = (0..scores.len()).collect();
    // Stable sort, so equal scores stay in record order.
    order.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]));
    let overall_efficiency: Vec<EfficiencyRecord> = order
        .iter()
        .enumerate()
        .map(|(i, index)| ranked(&dataset.records()[*index], scores[*index], i + 1))
        .collect();
    let least_efficient = overall_efficiency
        .iter()
        .rev()
        .take(bottom_count)
        .cloned()
        .collect();

    let mut groups: BTreeMap<&str, Vec<&EfficiencyRecord>> = BTreeMap::new();
    for record in &overall_efficiency {
        groups
            .entry(record.equipment_type.as_str())
            .or_default()
            .push(record);
    }
    let by_type = groups
        .into_iter()
        .filter_map(|(equipment_type, records)| {
            type_efficiency(&records).map(|summary| (equipment_type.to_string(), summary))
        })
        .collect();

    let average_score = scores.iter().sum::<f64>() / scores.len() as f64;
    Ok(Efficiency {
        status: SectionStatus::Computed,
        by_type,
        average_score: Some(average_score),
        weights: weights.normalised(),
        warnings,
        rankings: EfficiencyRankings {
            overall_efficiency,
            least_efficient,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    fn assert_close(expected: f64, actual: f64) {
        assert!(
            (expected - actual).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn single_record_scores_one() {
        let dataset = test_utils::get_single_record_dataset();
        let efficiency = score(&dataset, &EfficiencyWeights::default(), 5).unwrap();
        let ranking = &efficiency.rankings.overall_efficiency;
        assert_eq!(1, ranking.len());
        assert_eq!(1.0, ranking[0].efficiency_score);
        assert_eq!(1, ranking[0].rank);
        assert!(efficiency.warnings.is_empty());
        assert!(efficiency.by_type["Reactor"].insufficient_data);
    }

    #[test]
    fn best_and_worst() {
        let dataset = Dataset::from_records(vec![
            EquipmentRecord::new("Worst", "Pump", 0.0, 2.0, 0.0),
            EquipmentRecord::new("Best", "Pump", 10.0, 1.0, 10.0),
            EquipmentRecord::new("Middle", "Valve", 5.0, 1.5, 5.0),
        ]);
        let efficiency = score(&dataset, &EfficiencyWeights::default(), 5).unwrap();
        let ranking = &efficiency.rankings.overall_efficiency;
        assert_eq!("Best", ranking[0].equipment_name);
        assert_close(1.0, ranking[0].efficiency_score);
        assert_eq!("Middle", ranking[1].equipment_name);
        assert_close(0.5, ranking[1].efficiency_score);
        assert_eq!("Worst", ranking[2].equipment_name);
        assert_close(0.0, ranking[2].efficiency_score);
        assert_close(0.5, efficiency.average_score.unwrap());
    }

    #[test]
    fn weights_change_score() {
        let dataset = Dataset::from_records(vec![
            EquipmentRecord::new("A", "Pump", 0.0, 1.0, 10.0),
            EquipmentRecord::new("B", "Pump", 10.0, 2.0, 0.0),
        ]);
        let weights = EfficiencyWeights::new(1.0, 0.0, 0.0);
        let efficiency = score(&dataset, &weights, 5).unwrap();
        assert_eq!("B", efficiency.rankings.overall_efficiency[0].equipment_name);
        assert_eq!(weights, efficiency.weights);
    }

    #[test]
    fn ranks_are_permutation() {
        let dataset = test_utils::get_test_dataset();
        let efficiency = score(&dataset, &EfficiencyWeights::default(), 5).unwrap();
        let mut ranks: Vec<usize> = efficiency
            .rankings
            .overall_efficiency
            .iter()
            .map(|r| r.rank)
            .collect();
        ranks.sort();
        assert_eq!(vec![1, 2, 3, 4, 5], ranks);
        for pair in efficiency.rankings.overall_efficiency.windows(2) {
            assert!(pair[0].efficiency_score >= pair[1].efficiency_score);
        }
        for record in &efficiency.rankings.overall_efficiency {
            assert!((0.0..=1.0).contains(&record.efficiency_score));
        }
    }

    #[test]
    fn ties_keep_record_order() {
        let dataset = Dataset::from_records(vec![
            EquipmentRecord::new("A", "Pump", 1.0, 1.0, 1.0),
            EquipmentRecord::new("B", "Pump", 2.0, 1.0, 2.0),
            EquipmentRecord::new("C", "Pump", 1.0, 1.0, 1.0),
        ]);
        let efficiency = score(&dataset, &EfficiencyWeights::default(), 5).unwrap();
        let names: Vec<&str> = efficiency
            .rankings
            .overall_efficiency
            .iter()
            .map(|r| r.equipment_name.as_str())
            .collect();
        assert_eq!(vec!["B", "A", "C"], names);
        assert_eq!(
            vec![ComputationWarning::ZeroRange {
                parameter: Parameter::Pressure
            }],
            efficiency.warnings
        );
    }

    #[test]
    fn least_efficient_ascending() {
        let dataset = test_utils::get_test_dataset();
        let efficiency = score(&dataset, &EfficiencyWeights::default(), 2).unwrap();
        let least = &efficiency.rankings.least_efficient;
        assert_eq!(2, least.len());
        assert_eq!(5, least[0].rank);
        assert_eq!(4, least[1].rank);
    }

    #[test]
    fn by_type_top_performer() {
        let dataset = test_utils::get_test_dataset();
        let efficiency = score(&dataset, &EfficiencyWeights::default(), 5).unwrap();
        assert_eq!(3, efficiency.by_type.len());
        for (equipment_type, summary) in &efficiency.by_type {
            let best = efficiency
                .rankings
                .overall_efficiency
                .iter()
                .find(|r| &r.equipment_type == equipment_type)
                .unwrap();
            assert_eq!(best, &summary.top_performer);
            assert!(summary.min <= summary.mean && summary.mean <= summary.max);
        }
        assert_eq!(2, efficiency.by_type["Pump"].count);
    }

    #[test]
    fn empty_dataset() {
        assert!(score(&Dataset::default(), &EfficiencyWeights::default(), 5).is_err());
    }
}
