//! Numeric equipment parameters

use crate::types::EquipmentRecord;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// One of the three numeric parameters recorded for every piece of equipment.
///
/// Serialises as the CSV column name, which is also the key used for per-parameter maps in the
/// analysis result.
#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub enum Parameter {
    /// Volumetric flow rate
    Flowrate,
    /// Operating pressure
    Pressure,
    /// Operating temperature
    Temperature,
}

impl Parameter {
    /// All parameters, in column order.
    pub const ALL: [Parameter; 3] = [
        Parameter::Flowrate,
        Parameter::Pressure,
        Parameter::Temperature,
    ];

    /// Unordered parameter pairs, in the order used for key correlations.
    pub const PAIRS: [(Parameter, Parameter); 3] = [
        (Parameter::Flowrate, Parameter::Pressure),
        (Parameter::Flowrate, Parameter::Temperature),
        (Parameter::Pressure, Parameter::Temperature),
    ];

    /// Position of the parameter within [Parameter::ALL].
    pub fn index(self) -> usize {
        match self {
            Self::Flowrate => 0,
            Self::Pressure => 1,
            Self::Temperature => 2,
        }
    }

    /// Lower case name used to build snake case keys such as `flowrate_pressure`.
    pub fn key(self) -> &'static str {
        match self {
            Self::Flowrate => "flowrate",
            Self::Pressure => "pressure",
            Self::Temperature => "temperature",
        }
    }

    /// Returns the value of this parameter for a record.
    pub fn value_of(self, record: &EquipmentRecord) -> f64 {
        match self {
            Self::Flowrate => record.flowrate,
            Self::Pressure => record.pressure,
            Self::Temperature => record.temperature,
        }
    }
}
