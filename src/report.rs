//! PDF reports
//!
//! Report generation is split in two. [build] lays out the content of a stored analysis as a
//! renderer-independent [Report], and [render] draws a report as a PDF document using genpdf.

use crate::error::ChemvizError;
use crate::models::{AnalysisResult, DatasetMeta, SectionStatus};
use crate::types::Parameter;

use genpdf::elements::{Break, FrameCellDecorator, Paragraph, TableLayout, UnorderedList};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::style::{Style, StyledString};
use genpdf::{Document, SimplePageDecorator};
use time::format_description::well_known::Rfc3339;

/// Maximum number of ranked records listed in a report.
pub const RANKING_ROWS: usize = 10;

/// One block of report content.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Heading(String),
    Paragraph(String),
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    List(Vec<String>),
}

/// The content of a report, in order.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl Report {
    fn heading(&mut self, text: &str) {
        self.blocks.push(Block::Heading(text.to_string()));
    }

    fn paragraph(&mut self, text: String) {
        self.blocks.push(Block::Paragraph(text));
    }

    fn table(&mut self, header: &[&str], rows: Vec<Vec<String>>) {
        self.blocks.push(Block::Table {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows,
        });
    }

    /// Adds the reason a section is unavailable. Returns whether it was.
    fn unavailable(&mut self, status: &SectionStatus) -> bool {
        match status {
            SectionStatus::Computed => false,
            SectionStatus::Unavailable { reason } => {
                self.paragraph(format!("Not available: {reason}."));
                true
            }
        }
    }
}

fn number(value: f64) -> String {
    format!("{value:.2}")
}

fn overview(report: &mut Report, result: &AnalysisResult, meta: &DatasetMeta) {
    let uploaded = meta
        .upload_date
        .format(&Rfc3339)
        .unwrap_or_else(|_| meta.upload_date.to_string());
    report.heading("Dataset overview");
    report.table(
        &["Field", "Value"],
        vec![
            vec!["File".to_string(), meta.filename.clone()],
            vec!["Uploaded".to_string(), uploaded],
            vec!["Uploaded by".to_string(), meta.user.clone()],
            vec!["Equipment".to_string(), meta.equipment_count.to_string()],
            vec![
                "Equipment types".to_string(),
                result
                    .summary_metrics
                    .dataset_overview
                    .equipment_types_count
                    .to_string(),
            ],
        ],
    );
    let info = &result.dataset_info;
    report.paragraph(format!(
        "{} rows uploaded: {} dropped as too sparse, {} values imputed, {} duplicates removed, \
         {} rows analysed.",
        info.original_rows,
        info.dropped_sparse_rows,
        info.imputed_values,
        info.duplicates_removed,
        info.cleaned_rows
    ));
}

fn statistics(report: &mut Report, result: &AnalysisResult) {
    report.heading("Descriptive statistics");
    if report.unavailable(&result.summary_metrics.status) {
        return;
    }
    let rows = result
        .summary_metrics
        .overall_stats
        .iter()
        .map(|(parameter, summary)| {
            vec![
                parameter.to_string(),
                number(summary.mean),
                number(summary.std),
                number(summary.min),
                number(summary.q50),
                number(summary.max),
            ]
        })
        .collect();
    report.table(&["Parameter", "Mean", "Std", "Min", "Median", "Max"], rows);

    report.heading("Equipment types");
    let rows = result
        .distributions
        .equipment_types
        .iter()
        .map(|(equipment_type, count)| {
            let averages = &result.distributions.grouped_averages[equipment_type];
            let mut row = vec![equipment_type.clone(), count.to_string()];
            row.extend(Parameter::ALL.iter().map(|p| number(averages[p])));
            row
        })
        .collect();
    report.table(
        &["Type", "Count", "Mean flowrate", "Mean pressure", "Mean temperature"],
        rows,
    );
}

fn correlations(report: &mut Report, result: &AnalysisResult) {
    report.heading("Key correlations");
    if report.unavailable(&result.correlations.status) {
        return;
    }
    if let Some(key_correlations) = &result.correlations.key_correlations {
        let rows = key_correlations
            .pairs()
            .iter()
            .map(|((a, b), r)| vec![format!("{a} / {b}"), number(*r)])
            .collect();
        report.table(&["Parameters", "Pearson r"], rows);
    }
}

fn efficiency(report: &mut Report, result: &AnalysisResult) {
    report.heading("Efficiency ranking");
    if report.unavailable(&result.efficiency.status) {
        return;
    }
    let rows = result
        .efficiency
        .rankings
        .overall_efficiency
        .iter()
        .take(RANKING_ROWS)
        .map(|record| {
            vec![
                record.rank.to_string(),
                record.equipment_name.clone(),
                record.equipment_type.clone(),
                number(record.efficiency_score),
            ]
        })
        .collect();
    report.table(&["Rank", "Equipment", "Type", "Score"], rows);
}

fn outliers(report: &mut Report, result: &AnalysisResult) {
    report.heading("Outliers");
    if report.unavailable(&result.outliers.status) {
        return;
    }
    let rows = result
        .outliers
        .basic_analysis
        .iter()
        .map(|(parameter, outliers)| {
            vec![
                parameter.to_string(),
                format!(
                    "{} to {}",
                    number(outliers.normal_range.0),
                    number(outliers.normal_range.1)
                ),
                outliers.outlier_count.to_string(),
                format!("{:.1}%", outliers.outlier_percentage),
            ]
        })
        .collect();
    report.table(&["Parameter", "Normal range", "Outliers", "Share"], rows);
}

fn high_temperature(report: &mut Report, result: &AnalysisResult) {
    let analysis = &result.high_temperature_analysis;
    report.heading("High temperature equipment");
    report.paragraph(format!(
        "{} of {} equipment ({:.1}%) operate at or above {}.",
        analysis.count, analysis.total_equipment, analysis.percentage, analysis.threshold
    ));
    if !analysis.equipment_list.is_empty() {
        let rows = analysis
            .equipment_list
            .iter()
            .map(|record| {
                vec![
                    record.name.clone(),
                    record.equipment_type.clone(),
                    number(record.temperature),
                ]
            })
            .collect();
        report.table(&["Equipment", "Type", "Temperature"], rows);
    }
}

/// Lay out the content of a report for a stored analysis.
///
/// # Arguments
///
/// * `result`: Stored analysis
/// * `meta`: Bookkeeping of the stored dataset
pub fn build(result: &AnalysisResult, meta: &DatasetMeta) -> Report {
    let mut report = Report {
        title: format!("Equipment analysis report: {}", meta.filename),
        blocks: Vec::new(),
    };
    overview(&mut report, result, meta);
    statistics(&mut report, result);
    correlations(&mut report, result);
    efficiency(&mut report, result);
    outliers(&mut report, result);
    high_temperature(&mut report, result);
    report.heading("Recommendations");
    report.blocks.push(Block::List(
        result.comprehensive_insights.recommendations.clone(),
    ));
    report
}

/// Load a font family from a directory.
///
/// # Arguments
///
/// * `dir`: Directory holding the font files
/// * `family`: Font family name, e.g. `LiberationSans`
pub fn load_fonts(dir: &str, family: &str) -> Result<FontFamily<FontData>, genpdf::error::Error> {
    genpdf::fonts::from_files(dir, family, None)
}

/// Render a report as a PDF document.
///
/// # Arguments
///
/// * `report`: Report content
/// * `fonts`: Font family to render with
pub fn render(report: &Report, fonts: FontFamily<FontData>) -> Result<Vec<u8>, ChemvizError> {
    let mut document = Document::new(fonts);
    document.set_title(&report.title);
    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(20);
    document.set_page_decorator(decorator);

    let title_style = Style::new().bold().with_font_size(18);
    let heading_style = Style::new().bold().with_font_size(13);
    document.push(Paragraph::new(StyledString::new(
        report.title.clone(),
        title_style,
    )));
    document.push(Break::new(1));

    for block in &report.blocks {
        match block {
            Block::Heading(text) => {
                document.push(Break::new(1));
                document.push(Paragraph::new(StyledString::new(
                    text.clone(),
                    heading_style,
                )));
                document.push(Break::new(0.5));
            }
            Block::Paragraph(text) => document.push(Paragraph::new(text.clone())),
            Block::Table { header, rows } => {
                let mut table = TableLayout::new(vec![1; header.len()]);
                table.set_cell_decorator(FrameCellDecorator::new(true, true, false));
                let mut header_row = table.row();
                for cell in header {
                    header_row.push_element(Paragraph::new(StyledString::new(
                        cell.clone(),
                        Style::new().bold(),
                    )));
                }
                header_row.push()?;
                for cells in rows {
                    let mut row = table.row();
                    for cell in cells {
                        row.push_element(Paragraph::new(cell.clone()));
                    }
                    row.push()?;
                }
                document.push(table);
            }
            Block::List(items) => {
                let mut list = UnorderedList::new();
                for item in items {
                    list.push(Paragraph::new(item.clone()));
                }
                document.push(list);
            }
        }
    }

    let mut pdf = Vec::new();
    document.render(&mut pdf)?;
    Ok(pdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InsufficientDataError;
    use crate::models::{Correlations, Section};
    use crate::test_utils;

    use time::OffsetDateTime;

    fn get_test_meta() -> DatasetMeta {
        DatasetMeta {
            id: 7,
            user: "alice".to_string(),
            filename: "plant.csv".to_string(),
            file_size: 200,
            upload_date: OffsetDateTime::UNIX_EPOCH,
            equipment_count: 5,
        }
    }

    fn headings(report: &Report) -> Vec<&str> {
        report
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Heading(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The block following a heading.
    fn section<'a>(report: &'a Report, heading: &str) -> &'a Block {
        let index = report
            .blocks
            .iter()
            .position(|block| block == &Block::Heading(heading.to_string()))
            .unwrap();
        &report.blocks[index + 1]
    }

    #[test]
    fn build_sections() {
        let report = build(&test_utils::get_test_analysis(), &get_test_meta());
        assert_eq!("Equipment analysis report: plant.csv", report.title);
        assert_eq!(
            vec![
                "Dataset overview",
                "Descriptive statistics",
                "Equipment types",
                "Key correlations",
                "Efficiency ranking",
                "Outliers",
                "High temperature equipment",
                "Recommendations"
            ],
            headings(&report)
        );
    }

    #[test]
    fn build_overview() {
        let report = build(&test_utils::get_test_analysis(), &get_test_meta());
        match section(&report, "Dataset overview") {
            Block::Table { header, rows } => {
                assert_eq!(vec!["Field", "Value"], *header);
                assert_eq!(vec!["File", "plant.csv"], rows[0]);
                assert_eq!(vec!["Uploaded", "1970-01-01T00:00:00Z"], rows[1]);
                assert_eq!(vec!["Uploaded by", "alice"], rows[2]);
            }
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[test]
    fn build_statistics_table() {
        let report = build(&test_utils::get_test_analysis(), &get_test_meta());
        match section(&report, "Descriptive statistics") {
            Block::Table { rows, .. } => {
                assert_eq!(3, rows.len());
                assert_eq!(
                    vec!["Flowrate", "97.00", "22.80", "60.00", "100.00", "120.00"],
                    rows[0]
                );
            }
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[test]
    fn build_ranking_limited() {
        let report = build(&test_utils::get_test_analysis(), &get_test_meta());
        match section(&report, "Efficiency ranking") {
            Block::Table { rows, .. } => {
                assert_eq!(5, rows.len());
                assert_eq!("1", rows[0][0]);
            }
            other => panic!("unexpected block {:?}", other),
        }
    }

    #[test]
    fn build_unavailable_section() {
        let mut result = test_utils::get_test_analysis();
        result.correlations = Correlations::unavailable(&InsufficientDataError::TooFewRows {
            section: "correlation",
            rows: 1,
            required: 2,
        });
        let report = build(&result, &get_test_meta());
        assert_eq!(
            &Block::Paragraph(
                "Not available: correlation requires at least 2 rows, got 1.".to_string()
            ),
            section(&report, "Key correlations")
        );
    }

    #[test]
    fn build_recommendations() {
        let result = test_utils::get_test_analysis();
        let report = build(&result, &get_test_meta());
        assert_eq!(
            &Block::List(result.comprehensive_insights.recommendations.clone()),
            section(&report, "Recommendations")
        );
    }

    #[test]
    fn build_idempotent() {
        let result = test_utils::get_test_analysis();
        assert_eq!(
            build(&result, &get_test_meta()),
            build(&result, &get_test_meta())
        );
    }
}
