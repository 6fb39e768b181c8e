//! Analysis policy configuration.

use crate::cli::CommandLineArgs;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Relative weights of the terms of the efficiency score.
///
/// The score rewards high flowrate, high temperature and low pressure. Equal weights are a policy
/// choice rather than a physical law, so they are configurable.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[validate(schema(function = "validate_weights"))]
pub struct EfficiencyWeights {
    /// Weight of normalised flowrate
    #[validate(range(min = 0.0))]
    pub flowrate: f64,
    /// Weight of normalised temperature
    #[validate(range(min = 0.0))]
    pub temperature: f64,
    /// Weight of inverse normalised pressure
    #[validate(range(min = 0.0))]
    pub pressure: f64,
}

impl EfficiencyWeights {
    /// Return new weights. They need not sum to one.
    pub fn new(flowrate: f64, temperature: f64, pressure: f64) -> Self {
        Self {
            flowrate,
            temperature,
            pressure,
        }
    }

    /// Returns the weights scaled to sum to one.
    pub fn normalised(&self) -> Self {
        let total = self.flowrate + self.temperature + self.pressure;
        Self {
            flowrate: self.flowrate / total,
            temperature: self.temperature / total,
            pressure: self.pressure / total,
        }
    }
}

impl Default for EfficiencyWeights {
    fn default() -> Self {
        Self::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)
    }
}

/// Validate that the weights can be normalised.
fn validate_weights(weights: &EfficiencyWeights) -> Result<(), ValidationError> {
    let total = weights.flowrate + weights.temperature + weights.pressure;
    if !total.is_finite() || total <= 0.0 {
        return Err(ValidationError::new("Efficiency weights must sum to a positive value"));
    }
    Ok(())
}

/// Thresholds and limits applied by the analysis pipeline.
#[derive(Clone, Debug, PartialEq, Validate)]
pub struct AnalysisConfig {
    /// Temperatures at or above this are reported as high
    pub high_temperature_threshold: f64,
    /// Maximum number of outliers listed per parameter
    #[validate(range(min = 1))]
    pub outlier_display_limit: usize,
    /// Outlier percentage above which a recommendation is made
    #[validate(range(min = 0.0, max = 100.0))]
    pub outlier_rate_threshold: f64,
    /// Absolute correlation above which a pair is reported as strongly correlated
    #[validate(range(min = 0.0, max = 1.0))]
    pub strong_correlation_threshold: f64,
    /// Length of top performer and least efficient lists
    #[validate(range(min = 1))]
    pub top_performer_count: usize,
    /// Weights of the efficiency score
    #[validate]
    pub efficiency_weights: EfficiencyWeights,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            high_temperature_threshold: 100.0,
            outlier_display_limit: 10,
            outlier_rate_threshold: 10.0,
            strong_correlation_threshold: 0.5,
            top_performer_count: 5,
            efficiency_weights: EfficiencyWeights::default(),
        }
    }
}

impl From<&CommandLineArgs> for AnalysisConfig {
    fn from(args: &CommandLineArgs) -> Self {
        Self {
            high_temperature_threshold: args.high_temperature_threshold,
            outlier_display_limit: args.outlier_display_limit,
            outlier_rate_threshold: args.outlier_rate_threshold,
            strong_correlation_threshold: args.strong_correlation_threshold,
            top_performer_count: args.top_performer_count,
            efficiency_weights: EfficiencyWeights::new(
                args.flowrate_weight,
                args.temperature_weight,
                args.pressure_weight,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        AnalysisConfig::default().validate().unwrap()
    }

    #[test]
    fn default_weights_are_equal() {
        let weights = EfficiencyWeights::default().normalised();
        assert!((weights.flowrate - weights.pressure).abs() < 1e-12);
        assert!((weights.flowrate - weights.temperature).abs() < 1e-12);
    }

    #[test]
    fn weights_normalised() {
        let weights = EfficiencyWeights::new(2.0, 1.0, 1.0).normalised();
        assert_eq!(0.5, weights.flowrate);
        assert_eq!(0.25, weights.temperature);
        assert_eq!(0.25, weights.pressure);
    }

    #[test]
    #[should_panic(expected = "Efficiency weights must sum to a positive value")]
    fn zero_weights() {
        let mut config = AnalysisConfig::default();
        config.efficiency_weights = EfficiencyWeights::new(0.0, 0.0, 0.0);
        config.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "range")]
    fn negative_weight() {
        let mut config = AnalysisConfig::default();
        config.efficiency_weights = EfficiencyWeights::new(1.0, -1.0, 1.0);
        config.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "outlier_display_limit")]
    fn zero_display_limit() {
        let mut config = AnalysisConfig::default();
        config.outlier_display_limit = 0;
        config.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "strong_correlation_threshold")]
    fn correlation_threshold_above_one() {
        let mut config = AnalysisConfig::default();
        config.strong_correlation_threshold = 1.5;
        config.validate().unwrap()
    }
}
