//! Domain models for the readmission cohort
//!
//! Admissions and patients are small enough to hold row-wise; event tables
//! never are and stay as Arrow batches.

pub mod admission;
pub mod patient;

pub use admission::{Admission, AdmissionQuality, CohortAdmission};
pub use patient::Patient;
