//! Insight synthesis
//!
//! Assembles the computed sections into headline insights and templated recommendations. Nothing
//! here computes new statistics, apart from the simple filters behind the high temperature and top
//! performer lists.

use crate::config::AnalysisConfig;
use crate::models::{
    AdvancedStatistics, ComprehensiveInsights, Correlations, Efficiency, HighPerformanceEquipment,
    HighTemperatureAnalysis, InsightOverview, Outliers, SectionStatus, SummaryMetrics,
    TemperatureStats, TypeInsight,
};
use crate::types::{Dataset, EquipmentRecord, Parameter};

use std::collections::BTreeMap;

/// A type whose mean efficiency is this far below the dataset average is reported.
pub const UNDERPERFORMANCE_MARGIN: f64 = 0.1;

/// Recommendation made when no threshold check fires.
pub const NO_ACTION: &str = "All monitored parameters are within expected ranges; no action required.";

/// Report equipment operating at or above a temperature threshold.
///
/// # Arguments
///
/// * `dataset`: Cleaned dataset
/// * `threshold`: Temperature threshold, inclusive
pub fn high_temperature(dataset: &Dataset, threshold: f64) -> HighTemperatureAnalysis {
    let equipment_list: Vec<EquipmentRecord> = dataset
        .records()
        .iter()
        .filter(|record| record.temperature >= threshold)
        .cloned()
        .collect();
    let count = equipment_list.len();
    let temperature_stats = (count > 0).then(|| {
        let temperatures = equipment_list.iter().map(|record| record.temperature);
        TemperatureStats {
            min: temperatures.clone().fold(f64::INFINITY, f64::min),
            max: temperatures.clone().fold(f64::NEG_INFINITY, f64::max),
            mean: temperatures.sum::<f64>() / count as f64,
        }
    });
    let percentage = if dataset.is_empty() {
        0.0
    } else {
        count as f64 * 100.0 / dataset.len() as f64
    };
    HighTemperatureAnalysis {
        threshold,
        count,
        total_equipment: dataset.len(),
        percentage,
        temperature_stats,
        equipment_list,
    }
}

/// List the records with the highest values of each parameter.
///
/// Records are ordered by descending value. Ties keep record order.
///
/// # Arguments
///
/// * `dataset`: Cleaned dataset
/// * `count`: Maximum length of each list
pub fn top_performers(
    dataset: &Dataset,
    count: usize,
) -> BTreeMap<Parameter, Vec<EquipmentRecord>> {
    Parameter::ALL
        .into_iter()
        .map(|parameter| {
            let mut records: Vec<&EquipmentRecord> = dataset.records().iter().collect();
            records.sort_by(|a, b| parameter.value_of(b).total_cmp(&parameter.value_of(a)));
            let top = records.into_iter().take(count).cloned().collect();
            (parameter, top)
        })
        .collect()
}

/// The computed sections that insights are drawn from.
pub struct Findings<'a> {
    pub dataset: &'a Dataset,
    pub summary_metrics: &'a SummaryMetrics,
    pub correlations: &'a Correlations,
    pub efficiency: &'a Efficiency,
    pub outliers: &'a Outliers,
    pub advanced_statistics: &'a AdvancedStatistics,
    pub high_temperature: &'a HighTemperatureAnalysis,
}

impl Findings<'_> {
    /// Sections with their display names, in report order.
    fn statuses(&self) -> [(&'static str, &SectionStatus); 5] {
        [
            ("Summary statistics", &self.summary_metrics.status),
            ("Correlation analysis", &self.correlations.status),
            ("Efficiency scoring", &self.efficiency.status),
            ("Outlier detection", &self.outliers.status),
            ("Advanced statistics", &self.advanced_statistics.status),
        ]
    }
}

fn direction(r: f64) -> &'static str {
    if r > 0.0 {
        "positive"
    } else {
        "negative"
    }
}

/// Generate recommendations from threshold checks over the findings.
fn recommendations(findings: &Findings, config: &AnalysisConfig) -> Vec<String> {
    let mut recommendations = Vec::new();

    if let Some(key_correlations) = &findings.correlations.key_correlations {
        for ((a, b), r) in key_correlations.pairs() {
            if r.abs() > config.strong_correlation_threshold {
                recommendations.push(format!(
                    "Strong {} correlation between {a} and {b} (r = {r:.2}); monitor them together.",
                    direction(r)
                ));
            }
        }
    }

    for (parameter, report) in &findings.outliers.basic_analysis {
        if report.outlier_percentage > config.outlier_rate_threshold {
            recommendations.push(format!(
                "High outlier rate for {parameter}: {:.1}% of equipment is outside the normal range \
                 ({:.2} to {:.2}); inspect these units.",
                report.outlier_percentage, report.normal_range.0, report.normal_range.1
            ));
        }
    }

    let high_temperature = findings.high_temperature;
    if high_temperature.count > 0 {
        recommendations.push(format!(
            "{} of {} equipment operate at or above {} degrees; review their thermal load.",
            high_temperature.count, high_temperature.total_equipment, high_temperature.threshold
        ));
    }

    if let Some(average) = findings.efficiency.average_score {
        for (equipment_type, summary) in &findings.efficiency.by_type {
            if summary.mean < average - UNDERPERFORMANCE_MARGIN {
                recommendations.push(format!(
                    "{equipment_type} equipment has below average efficiency ({:.2} against \
                     {average:.2}); review its operating conditions.",
                    summary.mean
                ));
            }
        }
    }

    for (section, status) in findings.statuses() {
        if let SectionStatus::Unavailable { reason } = status {
            recommendations.push(format!("{section} is unavailable: {reason}."));
        }
    }

    if recommendations.is_empty() {
        recommendations.push(NO_ACTION.to_string());
    }
    recommendations
}

/// Summarise each equipment type.
fn type_analysis(findings: &Findings) -> BTreeMap<String, TypeInsight> {
    findings
        .dataset
        .by_type()
        .into_iter()
        .map(|(equipment_type, group)| {
            let performance_summary = match findings.efficiency.by_type.get(&equipment_type) {
                Some(summary) => format!(
                    "Average efficiency {:.2}, best performer {}",
                    summary.mean, summary.top_performer.equipment_name
                ),
                None => "Efficiency not computed".to_string(),
            };
            let insight = TypeInsight {
                count: group.len(),
                performance_summary,
            };
            (equipment_type, insight)
        })
        .collect()
}

/// Synthesise insights and recommendations from the computed sections.
#[tracing::instrument(level = "DEBUG", skip_all)]
pub fn synthesize(findings: &Findings, config: &AnalysisConfig) -> ComprehensiveInsights {
    ComprehensiveInsights {
        dataset_overview: InsightOverview {
            total_equipment: findings.dataset.len(),
            equipment_types: findings.dataset.types().len(),
        },
        equipment_type_analysis: type_analysis(findings),
        high_performance_equipment: HighPerformanceEquipment {
            best_performer: findings
                .efficiency
                .rankings
                .overall_efficiency
                .first()
                .cloned(),
        },
        recommendations: recommendations(findings, config),
    }
}
