//! Laboratory results: last value per admission and category
//!
//! Lab items are resolved once from the item dictionary into an
//! `itemid -> category` allow-list. The fold keeps cohort rows for allowed
//! items with a value and a chart time; the reduction keeps, per admission
//! and category, the row with the greatest `(charttime, row position)`.

use std::sync::Arc;

use arrow::array::Array;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::Result;
use crate::filter::{AdmissionFilter, AndFilter, BatchFilter, ItemFilter, NotNullFilter};
use crate::rules::LabRule;
use crate::utils::arrow::{column_as, int64_column, opt_f64, opt_i64, opt_str, utf8_column};
use crate::utils::time::parse_timestamp;

/// Dictionary item id to lab category index
pub type LabItemMap = FxHashMap<i64, usize>;

/// Resolve lab categories against the item dictionary
///
/// Labels match case-insensitively and exactly. With `blood_only`, and when
/// the dictionary records a specimen fluid for any item, only `Blood` items
/// are accepted.
pub fn resolve_lab_items(items: &[RecordBatch], rules: &[LabRule], blood_only: bool) -> Result<LabItemMap> {
    let mut map = LabItemMap::default();

    let has_fluid = items.iter().any(|batch| {
        batch
            .column_by_name("fluid")
            .is_some_and(|fluid| fluid.null_count() < fluid.len())
    });
    let restrict = blood_only && has_fluid;

    for batch in items {
        let ids = int64_column(batch, "d_labitems", "itemid")?;
        let labels = utf8_column(batch, "d_labitems", "label")?;
        let fluids = utf8_column(batch, "d_labitems", "fluid")?;

        for row in 0..batch.num_rows() {
            let (Some(item), Some(label)) = (opt_i64(ids, row), opt_str(labels, row)) else {
                continue;
            };
            if restrict && !opt_str(fluids, row).is_some_and(|f| f.eq_ignore_ascii_case("blood")) {
                continue;
            }
            if let Some(category) = rules.iter().position(|rule| rule.accepts(label)) {
                map.entry(item).or_insert(category);
            }
        }
    }

    for (index, rule) in rules.iter().enumerate() {
        let count = map.values().filter(|c| **c == index).count();
        if count == 0 {
            log::warn!("No lab items resolved for category {}", rule.name);
        } else {
            log::debug!("Lab category {} resolved to {count} items", rule.name);
        }
    }
    Ok(map)
}

/// Row filter for the lab fold
#[must_use]
pub fn lab_filter(cohort: &FxHashSet<i64>, items: &LabItemMap) -> AndFilter {
    let filters: Vec<Arc<dyn BatchFilter>> = vec![
        Arc::new(AdmissionFilter::new(cohort.clone())),
        Arc::new(ItemFilter::new(items.keys().copied().collect())),
        Arc::new(NotNullFilter::new(&["valuenum", "charttime"])),
    ];
    AndFilter::new(filters)
}

/// Last observed value per admission and lab category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabPanel {
    /// Category names in rule order
    pub names: Vec<String>,
    values: FxHashMap<i64, Vec<Option<f64>>>,
    /// Residue rows skipped for an unparseable chart time
    pub unparseable_times: usize,
}

impl LabPanel {
    /// Empty panel for the given categories
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            ..Self::default()
        }
    }

    /// Output column names (`lab_<category>`)
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.names.iter().map(|n| format!("lab_{n}")).collect()
    }

    /// Values for an admission; all missing when it had no lab rows
    #[must_use]
    pub fn row(&self, hadm_id: i64) -> Vec<Option<f64>> {
        self.values
            .get(&hadm_id)
            .cloned()
            .unwrap_or_else(|| vec![None; self.names.len()])
    }

    /// Number of admissions with at least one measured category
    #[must_use]
    pub fn measured_admissions(&self) -> usize {
        self.values.len()
    }

    /// Set one value directly
    pub fn set(&mut self, hadm_id: i64, category: usize, value: Option<f64>) {
        let width = self.names.len();
        if let Some(slot) = self
            .values
            .entry(hadm_id)
            .or_insert_with(|| vec![None; width])
            .get_mut(category)
        {
            *slot = value;
        }
    }
}

/// Reduce a lab residue to the last value per admission and category
///
/// `residue` must be in source order; ties on chart time go to the later
/// row.
pub fn reduce_last_values(residue: &RecordBatch, items: &LabItemMap, names: Vec<String>) -> Result<LabPanel> {
    let hadm = int64_column(residue, "labevents", "hadm_id")?;
    let item = int64_column(residue, "labevents", "itemid")?;
    let charttime = utf8_column(residue, "labevents", "charttime")?;
    let value = column_as::<arrow::array::Float64Array>(residue, "labevents", "valuenum")?;

    let mut latest: FxHashMap<(i64, usize), (NaiveDateTime, f64)> = FxHashMap::default();
    let mut panel = LabPanel::new(names);

    for row in 0..residue.num_rows() {
        let (Some(hadm_id), Some(item_id), Some(v)) =
            (opt_i64(hadm, row), opt_i64(item, row), opt_f64(value, row))
        else {
            continue;
        };
        let Some(&category) = items.get(&item_id) else {
            continue;
        };
        let Some(time) = opt_str(charttime, row).and_then(parse_timestamp) else {
            panel.unparseable_times += 1;
            continue;
        };

        latest
            .entry((hadm_id, category))
            .and_modify(|best| {
                if time >= best.0 {
                    *best = (time, v);
                }
            })
            .or_insert((time, v));
    }

    for ((hadm_id, category), (_, v)) in latest {
        panel.set(hadm_id, category, Some(v));
    }

    if panel.unparseable_times > 0 {
        log::warn!(
            "Skipped {} lab rows with unparseable chart times",
            panel.unparseable_times
        );
    }
    Ok(panel)
}
