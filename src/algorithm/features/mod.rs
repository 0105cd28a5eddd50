//! Feature assembly
//!
//! The cohort is the universal key set: every stage output is left-joined
//! onto it, categorical attributes are encoded, and after imputation the
//! columns are materialized in the versioned schema order.

pub mod assembler;
pub mod encoding;
pub mod frame;
pub mod table;

pub use assembler::{FeatureAssembler, StageOutputs, events_record_batch};
pub use encoding::{DemographicEncoder, DemographicRow};
pub use frame::FeatureFrame;
pub use table::FeatureTable;
