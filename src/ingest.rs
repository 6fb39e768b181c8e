//! Ingest and clean uploaded CSV data
//!
//! Cleaning happens in three passes over the parsed rows:
//!
//! 1. Rows with [DROP_THRESHOLD] or more missing numeric values are dropped. Values larger in
//!    magnitude than [MAX_ABS_VALUE] count as missing.
//! 2. Remaining missing values are imputed with the mean of the column over the retained rows.
//! 3. Exact duplicates of an earlier row are dropped.

use crate::error::IngestError;
use crate::models::{CleaningReport, ComputationWarning};
use crate::types::{Dataset, EquipmentRecord, Parameter, RawRecord};

use csv::{ReaderBuilder, StringRecord, Trim};
use hashbrown::HashSet;
use tracing::{event, Level};

/// Column holding the equipment name.
pub const NAME_COLUMN: &str = "Equipment Name";

/// Column holding the equipment type.
pub const TYPE_COLUMN: &str = "Type";

/// Columns every upload must have, in output order.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    NAME_COLUMN,
    TYPE_COLUMN,
    "Flowrate",
    "Pressure",
    "Temperature",
];

/// Rows with at least this many missing numeric values are dropped.
pub const DROP_THRESHOLD: usize = 3;

/// Largest magnitude of a numeric value. Fourth powers of larger deviations overflow `f64`.
pub const MAX_ABS_VALUE: f64 = 1e50;

/// Type given to rows with an empty type cell.
pub const UNKNOWN_TYPE: &str = "Unknown";

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Position of each required column in the upload's header row.
struct ColumnIndices {
    name: usize,
    equipment_type: usize,
    values: [usize; 3],
}

impl ColumnIndices {
    /// Locate the required columns. Header names are matched ignoring case.
    fn new(headers: &StringRecord) -> Result<Self, IngestError> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|header| header.eq_ignore_ascii_case(column))
                .ok_or_else(|| IngestError::MissingColumn {
                    column: column.to_string(),
                })
        };
        let name = find(NAME_COLUMN)?;
        let equipment_type = find(TYPE_COLUMN)?;
        let mut values = [0; 3];
        for parameter in Parameter::ALL {
            values[parameter.index()] = find(&parameter.to_string())?;
        }
        Ok(Self {
            name,
            equipment_type,
            values,
        })
    }
}

/// Parse a numeric cell. Empty, unparseable and non-finite cells are missing.
fn parse_value(cell: Option<&str>) -> Option<f64> {
    cell.and_then(|cell| cell.parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Parse CSV data into raw records.
///
/// # Arguments
///
/// * `data`: Uploaded file contents
pub fn parse(data: &[u8]) -> Result<Vec<RawRecord>, IngestError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(IngestError::EmptyFile);
    }

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data);
    let columns = ColumnIndices::new(reader.headers()?)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let equipment_type = match row.get(columns.equipment_type) {
            Some(cell) if !cell.is_empty() => cell,
            _ => UNKNOWN_TYPE,
        };
        records.push(RawRecord {
            name: row.get(columns.name).unwrap_or_default().to_string(),
            equipment_type: equipment_type.to_string(),
            values: columns.values.map(|index| parse_value(row.get(index))),
        });
    }
    Ok(records)
}

/// Mean of a set of values, or `None` if there are none.
///
/// The running update keeps every intermediate value within the range of the inputs, so the mean
/// of finite values is finite.
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut mean = None;
    for (count, value) in values.enumerate() {
        let current = mean.unwrap_or(0.0);
        mean = Some(current + (value - current) / (count + 1) as f64);
    }
    mean
}

/// Replace values larger than [MAX_ABS_VALUE] in magnitude with missing values.
///
/// Returns the number of values replaced for each parameter.
fn mark_out_of_range(raw: &mut [RawRecord]) -> [usize; 3] {
    let mut counts = [0; 3];
    for record in raw {
        for (value, count) in record.values.iter_mut().zip(counts.iter_mut()) {
            if value.map_or(false, |value| value.abs() > MAX_ABS_VALUE) {
                *value = None;
                *count += 1;
            }
        }
    }
    counts
}

/// Key identifying duplicate rows. Equal values have equal keys.
fn duplicate_key(record: &EquipmentRecord) -> (String, String, [u64; 3]) {
    // 0.0 and -0.0 compare equal but have different bits.
    let bits = |value: f64| if value == 0.0 { 0 } else { value.to_bits() };
    (
        record.name.clone(),
        record.equipment_type.clone(),
        Parameter::ALL.map(|parameter| bits(parameter.value_of(record))),
    )
}

/// Clean raw records into a dataset.
///
/// Returns the dataset along with a report of what cleaning changed.
///
/// # Arguments
///
/// * `raw`: Records as parsed, in upload order
pub fn clean(mut raw: Vec<RawRecord>) -> Result<(Dataset, CleaningReport), IngestError> {
    let mut report = CleaningReport {
        original_rows: raw.len(),
        columns: REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
        ..Default::default()
    };
    let out_of_range = mark_out_of_range(&mut raw);
    for parameter in Parameter::ALL {
        let count = out_of_range[parameter.index()];
        if count > 0 {
            report
                .warnings
                .push(ComputationWarning::ValueOutOfRange { parameter, count });
        }
    }

    let retained: Vec<RawRecord> = raw
        .into_iter()
        .filter(|record| record.missing_count() < DROP_THRESHOLD)
        .collect();
    report.dropped_sparse_rows = report.original_rows - retained.len();
    if retained.is_empty() {
        return Err(IngestError::NoRowsRemaining);
    }

    // Column means over the retained rows only.
    let means = Parameter::ALL.map(|parameter| {
        mean(retained.iter().filter_map(|record| record.value(parameter))).unwrap_or_else(|| {
            report
                .warnings
                .push(ComputationWarning::ColumnEntirelyMissing { parameter });
            0.0
        })
    });

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(retained.len());
    for raw_record in retained {
        report.imputed_values += raw_record.missing_count();
        let value = |parameter: Parameter| {
            raw_record
                .value(parameter)
                .unwrap_or(means[parameter.index()])
        };
        let record = EquipmentRecord {
            flowrate: value(Parameter::Flowrate),
            pressure: value(Parameter::Pressure),
            temperature: value(Parameter::Temperature),
            name: raw_record.name,
            equipment_type: raw_record.equipment_type,
        };
        if seen.insert(duplicate_key(&record)) {
            records.push(record);
        } else {
            report.duplicates_removed += 1;
        }
    }

    report.cleaned_rows = records.len();
    Ok((Dataset::from_records(records), report))
}

/// Parse and clean CSV data.
///
/// # Arguments
///
/// * `data`: Uploaded file contents
#[tracing::instrument(level = "DEBUG", skip(data), fields(bytes = data.len()))]
pub fn load(data: &[u8]) -> Result<(Dataset, CleaningReport), IngestError> {
    let raw = parse(data)?;
    let (dataset, report) = clean(raw)?;
    event!(
        Level::DEBUG,
        original_rows = report.original_rows,
        dropped_sparse_rows = report.dropped_sparse_rows,
        imputed_values = report.imputed_values,
        duplicates_removed = report.duplicates_removed,
        cleaned_rows = report.cleaned_rows,
        "cleaned upload"
    );
    Ok((dataset, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    fn load_str(data: &str) -> Result<(Dataset, CleaningReport), IngestError> {
        load(data.as_bytes())
    }

    #[test]
    fn load_sample() {
        let (dataset, report) = load_str(test_utils::SAMPLE_CSV).unwrap();
        assert_eq!(test_utils::get_test_dataset(), dataset);
        assert_eq!(5, report.original_rows);
        assert_eq!(5, report.cleaned_rows);
        assert_eq!(0, report.imputed_values);
        assert_eq!(REQUIRED_COLUMNS.to_vec(), report.columns);
    }

    #[test]
    fn header_match_ignores_case_and_bom() {
        let data = "\u{feff}equipment name,TYPE, flowrate ,Pressure,temperature\nP-1,Pump,1,2,3\n";
        let (dataset, _) = load_str(data).unwrap();
        assert_eq!(
            &[EquipmentRecord::new("P-1", "Pump", 1.0, 2.0, 3.0)],
            dataset.records()
        );
    }

    #[test]
    fn extra_columns_ignored() {
        let data = "Id,Equipment Name,Type,Flowrate,Pressure,Temperature,Notes\n\
                    7,P-1,Pump,1,2,3,ok\n";
        let (dataset, _) = load_str(data).unwrap();
        assert_eq!("P-1", dataset.records()[0].name);
        assert_eq!(3.0, dataset.records()[0].temperature);
    }

    #[test]
    fn three_missing_dropped() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                    A,Pump,100,5,110\n\
                    B,Pump,,,\n";
        let (dataset, report) = load_str(data).unwrap();
        assert_eq!(1, dataset.len());
        assert_eq!("A", dataset.records()[0].name);
        assert_eq!(1, report.dropped_sparse_rows);
        assert_eq!(0, report.imputed_values);
    }

    #[test]
    fn two_missing_imputed() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                    A,Pump,100,5,110\n\
                    B,Pump,,,120\n\
                    C,Pump,200,7,130\n";
        let (dataset, report) = load_str(data).unwrap();
        assert_eq!(3, dataset.len());
        assert_eq!(
            EquipmentRecord::new("B", "Pump", 150.0, 6.0, 120.0),
            dataset.records()[1]
        );
        assert_eq!(0, report.dropped_sparse_rows);
        assert_eq!(2, report.imputed_values);
    }

    #[test]
    fn imputation_ignores_dropped_rows() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                    A,Pump,100,5,110\n\
                    X,Pump,,n/a,\n\
                    B,Pump,,5,120\n";
        let (dataset, report) = load_str(data).unwrap();
        assert_eq!(2, dataset.len());
        assert_eq!(1, report.dropped_sparse_rows);
        assert_eq!(100.0, dataset.records()[1].flowrate);
    }

    #[test]
    fn imputation_example() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                    A,Pump,100,5,110\n\
                    B,Pump,,5,120\n";
        let (dataset, report) = load_str(data).unwrap();
        assert_eq!(100.0, dataset.records()[1].flowrate);
        assert_eq!(1, report.imputed_values);
    }

    #[test]
    fn unparseable_values_missing() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                    A,Pump,abc,5,110\n\
                    B,Pump,10,inf,120\n\
                    C,Pump,20,7,NaN\n";
        let (dataset, report) = load_str(data).unwrap();
        assert_eq!(3, report.imputed_values);
        assert_eq!(15.0, dataset.records()[0].flowrate);
        assert_eq!(6.0, dataset.records()[1].pressure);
        assert_eq!(115.0, dataset.records()[2].temperature);
    }

    #[test]
    fn short_rows_treated_as_missing() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                    A,Pump,10,5,110\n\
                    B,Pump,20,7\n";
        let (dataset, report) = load_str(data).unwrap();
        assert_eq!(1, report.imputed_values);
        assert_eq!(110.0, dataset.records()[1].temperature);
    }

    #[test]
    fn column_entirely_missing() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                    A,Pump,10,5,\n\
                    B,Pump,20,7,n/a\n";
        let (dataset, report) = load_str(data).unwrap();
        assert_eq!(0.0, dataset.records()[0].temperature);
        assert_eq!(0.0, dataset.records()[1].temperature);
        assert_eq!(
            vec![ComputationWarning::ColumnEntirelyMissing {
                parameter: Parameter::Temperature
            }],
            report.warnings
        );
    }

    #[test]
    fn empty_type_is_unknown() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\nA,,1,2,3\n";
        let (dataset, _) = load_str(data).unwrap();
        assert_eq!(UNKNOWN_TYPE, dataset.records()[0].equipment_type);
    }

    #[test]
    fn duplicates_removed() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                    A,Pump,1,2,3\n\
                    B,Valve,4,5,6\n\
                    A,Pump,1.0,2,3\n\
                    C,Pump,1,2,3\n";
        let (dataset, report) = load_str(data).unwrap();
        let names: Vec<&str> = dataset.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(vec!["A", "B", "C"], names);
        assert_eq!(1, report.duplicates_removed);
        assert_eq!(3, report.cleaned_rows);
    }

    #[test]
    fn duplicates_detected_after_imputation() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                    A,Pump,10,2,3\n\
                    A,Pump,,2,3\n";
        let (dataset, report) = load_str(data).unwrap();
        assert_eq!(1, dataset.len());
        assert_eq!(1, report.duplicates_removed);
    }

    #[test]
    fn no_numeric_nulls_after_cleaning() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                    A,Pump,,2,\n\
                    B,Valve,4,,6\n\
                    C,Pump,1,x,3\n";
        let (dataset, _) = load_str(data).unwrap();
        for record in dataset.records() {
            for parameter in Parameter::ALL {
                assert!(parameter.value_of(record).is_finite());
            }
        }
    }

    #[test]
    fn empty_file() {
        assert!(matches!(load_str(""), Err(IngestError::EmptyFile)));
        assert!(matches!(load_str(" \n\r\n"), Err(IngestError::EmptyFile)));
        assert!(matches!(load(UTF8_BOM), Err(IngestError::EmptyFile)));
    }

    #[test]
    fn missing_column() {
        let data = "Equipment Name,Type,Flowrate,Temperature\nA,Pump,1,3\n";
        match load_str(data) {
            Err(error @ IngestError::MissingColumn { .. }) => {
                assert_eq!("missing required column: Pressure", error.to_string())
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn header_only() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\n";
        assert!(matches!(load_str(data), Err(IngestError::NoRowsRemaining)));
    }

    #[test]
    fn all_rows_dropped() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\nA,Pump,,,\nB,Pump,x,y,z\n";
        assert!(matches!(load_str(data), Err(IngestError::NoRowsRemaining)));
    }

    #[test]
    fn running_mean() {
        assert_eq!(None, mean(std::iter::empty()));
        assert_eq!(Some(2.0), mean([1.0, 2.0, 3.0].into_iter()));
        // A sum of these overflows.
        assert_eq!(
            Some(f64::MAX),
            mean([f64::MAX, f64::MAX, f64::MAX].into_iter())
        );
    }

    #[test]
    fn large_values_imputed_without_overflow() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                    A,Pump,1e50,1,1\n\
                    B,Pump,1e50,2,2\n\
                    C,Pump,,3,3\n";
        let (dataset, report) = load_str(data).unwrap();
        assert_eq!(1e50, dataset.records()[2].flowrate);
        assert_eq!(1, report.imputed_values);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn out_of_range_values_missing() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                    A,Pump,1e308,1,1\n\
                    B,Pump,-1e308,2,2\n\
                    C,Pump,,3,3\n\
                    D,Pump,10,1e60,4\n";
        let (dataset, report) = load_str(data).unwrap();
        assert_eq!(4, dataset.len());
        for record in dataset.records() {
            assert_eq!(10.0, record.flowrate);
            for parameter in Parameter::ALL {
                assert!(parameter.value_of(record).abs() <= MAX_ABS_VALUE);
            }
        }
        assert_eq!(2.0, dataset.records()[3].pressure);
        assert_eq!(4, report.imputed_values);
        assert_eq!(
            vec![
                ComputationWarning::ValueOutOfRange {
                    parameter: Parameter::Flowrate,
                    count: 2
                },
                ComputationWarning::ValueOutOfRange {
                    parameter: Parameter::Pressure,
                    count: 1
                },
            ],
            report.warnings
        );
    }

    #[test]
    fn out_of_range_values_count_towards_dropping() {
        let data = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                    A,Pump,1,2,3\n\
                    B,Pump,1e300,,1e300\n";
        let (dataset, report) = load_str(data).unwrap();
        assert_eq!(1, dataset.len());
        assert_eq!(1, report.dropped_sparse_rows);
    }

    #[test]
    fn invalid_utf8() {
        let data = b"Equipment Name,Type,Flowrate,Pressure,Temperature\nA,\xff\xfe,1,2,3\n";
        assert!(matches!(load(data), Err(IngestError::Malformed(_))));
    }
}
