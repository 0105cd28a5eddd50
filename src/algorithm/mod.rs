//! Pipeline stage implementations
//!
//! Each submodule is one stage of the readmission pipeline. Stages take
//! owned inputs, return owned outputs and record what they filtered in a
//! [`report::StageReport`].

pub mod cohort;
pub mod events;
pub mod features;
pub mod imputation;
pub mod model;
pub mod outcome;
pub mod report;
pub mod utilization;

pub use report::{FilterStep, StageReport};
