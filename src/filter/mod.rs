//! Row filters applied to event chunks
//!
//! Each filter produces a keep-mask for a conformed batch. The event folds
//! combine them with [`AndFilter`] and keep only the filtered residue.

pub mod admission;
pub mod columns;
pub mod core;

pub use admission::AdmissionFilter;
pub use columns::{CodeFilter, ItemFilter, NotNullFilter};
pub use core::{AndFilter, BatchFilter, IncludeAllFilter, filter_record_batch};
