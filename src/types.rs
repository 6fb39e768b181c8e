pub mod parameter;
pub mod record;

// Re-export types for convenience.
pub use crate::types::parameter::Parameter;
pub use crate::types::record::{Dataset, EquipmentRecord, RawRecord};
