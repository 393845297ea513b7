//! Summarize one cached result file: row count, month span, distinct regions.
//!
//! Usage: `inspect_cache <path/to/cache.csv>`

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing_subscriber::{fmt, EnvFilter};

use rxrates::reshape::month::parse_month;

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(path_arg) = std::env::args().nth(1) else {
        bail!("usage: inspect_cache <path/to/cache.csv>");
    };
    let path = Path::new(&path_arg);

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening cache file {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let month_idx = headers.iter().position(|h| h == "month");
    let region_idx = headers.iter().position(|h| h == "region_id");

    let mut rows = 0usize;
    let mut first: Option<NaiveDate> = None;
    let mut last: Option<NaiveDate> = None;
    let mut regions: BTreeSet<String> = BTreeSet::new();
    for record in reader.records() {
        let record = record.context("reading cache record")?;
        rows += 1;
        if let Some(idx) = month_idx {
            if let Some(raw) = record.get(idx) {
                let month = parse_month(raw)
                    .with_context(|| format!("bad month in row {rows}"))?;
                first = Some(first.map_or(month, |f| f.min(month)));
                last = Some(last.map_or(month, |l| l.max(month)));
            }
        }
        if let Some(idx) = region_idx {
            if let Some(region) = record.get(idx) {
                regions.insert(region.to_string());
            }
        }
    }

    println!("file:    {}", path.display());
    println!("columns: {}", headers.iter().collect::<Vec<_>>().join(", "));
    println!("rows:    {rows}");
    match (first, last) {
        (Some(first), Some(last)) => println!("months:  {first} to {last}"),
        _ => println!("months:  (no month column)"),
    }
    if region_idx.is_some() {
        println!("regions: {}", regions.len());
    }
    Ok(())
}
