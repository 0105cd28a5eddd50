//! Patient demographics

use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::arrow::{int64_column, opt_i64, opt_str, utf8_column};

/// One patient record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Patient identifier
    pub subject_id: i64,
    /// Recorded sex ("F" or "M")
    pub gender: Option<String>,
    /// Age in the anchor year
    pub anchor_age: i64,
    /// Year `anchor_age` refers to
    pub anchor_year: i64,
}

impl Patient {
    /// Age at a given calendar year
    #[must_use]
    pub fn age_in(&self, year: i64) -> i64 {
        self.anchor_age + (year - self.anchor_year)
    }

    /// Whether the recorded sex is female
    #[must_use]
    pub fn is_female(&self) -> bool {
        self.gender
            .as_deref()
            .is_some_and(|g| g.trim().eq_ignore_ascii_case("f"))
    }

    /// Index conformed patient batches by subject
    ///
    /// Rows without an id or anchor are skipped; the first record of a
    /// duplicated subject wins. Returns the index and the number of rows
    /// skipped.
    pub fn index_batches(batches: &[RecordBatch]) -> Result<(FxHashMap<i64, Self>, usize)> {
        let mut patients = FxHashMap::default();
        let mut skipped = 0;

        for batch in batches {
            let subject = int64_column(batch, "patients", "subject_id")?;
            let gender = utf8_column(batch, "patients", "gender")?;
            let age = int64_column(batch, "patients", "anchor_age")?;
            let year = int64_column(batch, "patients", "anchor_year")?;

            for row in 0..batch.num_rows() {
                let (Some(subject_id), Some(anchor_age), Some(anchor_year)) =
                    (opt_i64(subject, row), opt_i64(age, row), opt_i64(year, row))
                else {
                    skipped += 1;
                    continue;
                };
                if patients.contains_key(&subject_id) {
                    skipped += 1;
                    continue;
                }
                patients.insert(
                    subject_id,
                    Self {
                        subject_id,
                        gender: opt_str(gender, row).map(str::to_string),
                        anchor_age,
                        anchor_year,
                    },
                );
            }
        }

        if skipped > 0 {
            log::warn!("Skipped {skipped} patient rows without identifiers or with duplicate subjects");
        }
        Ok((patients, skipped))
    }
}
