// src/model.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical CSV header for a row type. Cache files are only trusted when
/// their header matches; must stay in sync with the struct field order.
pub trait CsvRecord {
    const HEADERS: &'static [&'static str];
}

/// One aggregated prescribing result row: items and cost for a single
/// chemical in a single region and month.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PrescribingRow {
    #[serde(with = "crate::reshape::month")]
    pub month: NaiveDate,
    pub region_id: String,
    pub chemical_code: String,
    pub chemical_name: String,
    pub total_items: u64,
    pub total_cost: f64,
}

impl CsvRecord for PrescribingRow {
    const HEADERS: &'static [&'static str] = &[
        "month",
        "region_id",
        "chemical_code",
        "chemical_name",
        "total_items",
        "total_cost",
    ];
}

/// Registered patient count for one region and month.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PopulationRow {
    #[serde(with = "crate::reshape::month")]
    pub month: NaiveDate,
    pub region_id: String,
    pub list_size: u64,
}

impl CsvRecord for PopulationRow {
    const HEADERS: &'static [&'static str] = &["month", "region_id", "list_size"];
}

/// Joined per-capita rate row, derived once per run.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct RateRow {
    #[serde(with = "crate::reshape::month")]
    pub month: NaiveDate,
    pub region_id: String,
    pub total_items: u64,
    pub list_size: u64,
    pub items_per_1000: f64,
}
