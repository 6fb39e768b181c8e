//! Equipment records and datasets
//!
//! Uploaded rows pass through two representations. A [RawRecord] holds the values as parsed, with
//! each numeric parameter possibly missing. Cleaning turns raw records into [EquipmentRecord]s, in
//! which every numeric parameter is present, and collects them into an immutable [Dataset].

use crate::types::Parameter;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A row as parsed from an upload, before cleaning.
#[derive(Clone, Debug, PartialEq)]
pub struct RawRecord {
    /// Equipment name
    pub name: String,
    /// Equipment type
    pub equipment_type: String,
    /// Numeric values indexed by [Parameter::index]. `None` marks a missing value.
    pub values: [Option<f64>; 3],
}

impl RawRecord {
    /// Returns the value of a parameter, if present.
    pub fn value(&self, parameter: Parameter) -> Option<f64> {
        self.values[parameter.index()]
    }

    /// Number of missing numeric values.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|value| value.is_none()).count()
    }
}

/// A single cleaned row.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EquipmentRecord {
    /// Equipment name
    #[serde(rename = "equipment_name")]
    pub name: String,
    /// Equipment type, e.g. Pump or Compressor
    #[serde(rename = "type")]
    pub equipment_type: String,
    /// Flow rate
    pub flowrate: f64,
    /// Pressure
    pub pressure: f64,
    /// Temperature
    pub temperature: f64,
}

impl EquipmentRecord {
    /// Return a new EquipmentRecord.
    pub fn new(
        name: &str,
        equipment_type: &str,
        flowrate: f64,
        pressure: f64,
        temperature: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            equipment_type: equipment_type.to_string(),
            flowrate,
            pressure,
            temperature,
        }
    }
}

/// An ordered, immutable collection of cleaned records for one upload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    records: Vec<EquipmentRecord>,
}

impl Dataset {
    /// Return a new Dataset holding the given records in order.
    pub fn from_records(records: Vec<EquipmentRecord>) -> Self {
        Self { records }
    }

    /// The records, in upload order.
    pub fn records(&self) -> &[EquipmentRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the values of one parameter as a 1D array, in record order.
    pub fn column(&self, parameter: Parameter) -> Array1<f64> {
        self.records
            .iter()
            .map(|record| parameter.value_of(record))
            .collect()
    }

    /// Distinct equipment types in order of first appearance.
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for record in &self.records {
            if !types.contains(&record.equipment_type.as_str()) {
                types.push(&record.equipment_type);
            }
        }
        types
    }

    /// Splits the dataset into one dataset per equipment type, keyed by type.
    ///
    /// Record order is preserved within each group.
    pub fn by_type(&self) -> BTreeMap<String, Dataset> {
        let mut groups: BTreeMap<String, Dataset> = BTreeMap::new();
        for record in &self.records {
            groups
                .entry(record.equipment_type.clone())
                .or_default()
                .records
                .push(record.clone());
        }
        groups
    }
}
