//! Cohort construction
//!
//! Admissions qualify through a diagnosis code in the configured range, are
//! joined with patient demographics and narrowed by eligibility filters.
//! Every step is recorded in the cohort's [`StageReport`].

pub mod builder;

use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashSet;

use crate::error::Result;
use crate::filter::{BatchFilter, CodeFilter};
use crate::rules::PatternClassifier;
use crate::utils::arrow::{int64_column, opt_i64};

pub use builder::{Cohort, CohortBuilder};

/// Collect the admissions with at least one qualifying diagnosis
///
/// `codes` is the folded diagnosis residue; only codes of `icd_version`
/// matching `qualifying` count.
pub fn qualifying_admissions(
    codes: &RecordBatch,
    icd_version: i64,
    qualifying: &PatternClassifier,
) -> Result<FxHashSet<i64>> {
    let matched = CodeFilter::new(icd_version, qualifying.clone()).filter(codes)?;
    let ids = int64_column(&matched, "diagnoses_icd", "hadm_id")?;
    let hadm_ids: FxHashSet<i64> = (0..matched.num_rows()).filter_map(|row| opt_i64(ids, row)).collect();

    log::info!(
        "{} of {} diagnosis rows qualify, covering {} admissions",
        matched.num_rows(),
        codes.num_rows(),
        hadm_ids.len()
    );
    Ok(hadm_ids)
}
