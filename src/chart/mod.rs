//! Decile time-series charts: percentile bands across the region population,
//! with one region overlaid for context.

pub mod render;

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;

/// Options for a decile chart, passed explicitly rather than read from any
/// process-wide theme.
#[derive(Debug, Clone)]
pub struct DecilesChartConfig {
    pub title: String,
    pub y_label: String,
    pub highlight_label: Option<String>,
    pub show_outer_percentiles: bool,
    pub out_path: PathBuf,
}

/// One percentile tracked across months.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentileSeries {
    pub percentile: u8,
    pub points: Vec<(NaiveDate, f64)>,
}

/// Percentiles drawn on a decile chart: deciles always, single percentiles in
/// the tails when requested.
pub fn chart_percentiles(show_outer: bool) -> Vec<u8> {
    let mut ps = Vec::new();
    if show_outer {
        ps.extend(1..=9);
    }
    ps.extend((10..=90).step_by(10));
    if show_outer {
        ps.extend(91..=99);
    }
    ps
}

/// Linear-interpolation percentile of an ascending-sorted slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
    }
}

/// Collapse (month, value) observations across regions into one series per
/// percentile. Months with no observations simply do not appear.
pub fn decile_series(points: &[(NaiveDate, f64)], show_outer: bool) -> Vec<PercentileSeries> {
    let mut by_month: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for &(month, value) in points {
        by_month.entry(month).or_default().push(value);
    }
    for values in by_month.values_mut() {
        values.sort_by(|a, b| a.total_cmp(b));
    }

    chart_percentiles(show_outer)
        .into_iter()
        .map(|p| PercentileSeries {
            percentile: p,
            points: by_month
                .iter()
                .map(|(&month, values)| (month, percentile(values, p as f64)))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, 1).unwrap()
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        // rank 0.25 * 4 = 1.0 exactly
        assert_eq!(percentile(&values, 25.0), 2.0);
        // rank 0.1 * 4 = 0.4 → between 1.0 and 2.0
        assert!((percentile(&values, 10.0) - 1.4).abs() < 1e-12);
    }

    #[test]
    fn decile_series_covers_every_month_in_order() {
        let points: Vec<(NaiveDate, f64)> = (1..=3)
            .flat_map(|m| (0..10).map(move |i| (month(m), i as f64)))
            .collect();
        let series = decile_series(&points, false);
        assert_eq!(series.len(), 9);
        for s in &series {
            let months: Vec<NaiveDate> = s.points.iter().map(|(m, _)| *m).collect();
            assert_eq!(months, vec![month(1), month(2), month(3)]);
        }
        // median of 0..=9 is 4.5 in every month
        let median = series.iter().find(|s| s.percentile == 50).unwrap();
        assert!(median.points.iter().all(|&(_, v)| (v - 4.5).abs() < 1e-12));
    }

    #[test]
    fn outer_percentiles_only_when_asked() {
        assert_eq!(chart_percentiles(false).len(), 9);
        let with_outer = chart_percentiles(true);
        assert_eq!(with_outer.len(), 27);
        assert!(with_outer.contains(&1) && with_outer.contains(&99));
    }
}
