//! The reshape stage: group-and-sum, population merge, rate derivation.

pub mod month;

use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::{PopulationRow, PrescribingRow, RateRow};

/// What to do with a (month, region) prescribing key that has no matching
/// population row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Inner-join semantics: unmatched keys are excluded from the result and
    /// the dropped count is logged.
    #[default]
    DropUnmatched,
    /// Any unmatched prescribing key aborts the merge.
    RequireMatch,
}

/// Sum `total_items` over chemicals, keyed by (month, region). Months are
/// normalized so callers never see mid-month dates. BTreeMap keeps the
/// output order deterministic.
pub fn monthly_totals(rows: &[PrescribingRow]) -> BTreeMap<(NaiveDate, String), u64> {
    let mut totals: BTreeMap<(NaiveDate, String), u64> = BTreeMap::new();
    for row in rows {
        *totals
            .entry((month::normalize(row.month), row.region_id.clone()))
            .or_insert(0) += row.total_items;
    }
    totals
}

/// Inner-join region totals against population list sizes and derive the
/// per-1000 rate. Duplicate population keys are an input defect; a zero list
/// size is an error under either policy.
pub fn merge_with_population(
    totals: BTreeMap<(NaiveDate, String), u64>,
    population: &[PopulationRow],
    policy: MergePolicy,
) -> Result<Vec<RateRow>> {
    let mut list_sizes: HashMap<(NaiveDate, &str), u64> = HashMap::new();
    for row in population {
        let key = (month::normalize(row.month), row.region_id.as_str());
        if list_sizes.insert(key, row.list_size).is_some() {
            bail!(
                "duplicate population row for region {} in {}",
                row.region_id,
                key.0
            );
        }
    }

    let mut out = Vec::with_capacity(totals.len());
    let mut dropped = 0usize;
    for ((month, region_id), total_items) in totals {
        let Some(&list_size) = list_sizes.get(&(month, region_id.as_str())) else {
            match policy {
                MergePolicy::RequireMatch => {
                    bail!("no population row for region {region_id} in {month}")
                }
                MergePolicy::DropUnmatched => {
                    debug!(%region_id, %month, "dropping prescribing key without population row");
                    dropped += 1;
                    continue;
                }
            }
        };
        let items_per_1000 = items_per_1000(total_items, list_size)?;
        out.push(RateRow {
            month,
            region_id,
            total_items,
            list_size,
            items_per_1000,
        });
    }
    if dropped > 0 {
        warn!(dropped, "prescribing keys had no matching population row");
    }
    Ok(out)
}

/// 1000 × items / list size. A zero list size means the rate is undefined,
/// never infinity.
pub fn items_per_1000(total_items: u64, list_size: u64) -> Result<f64> {
    if list_size == 0 {
        bail!("list size is zero; items_per_1000 is undefined");
    }
    Ok(1000.0 * total_items as f64 / list_size as f64)
}
