//! Choropleth inputs: region boundaries and the per-region value to shade by.

pub mod render;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use geojson::{GeoJson, Value as GeoValue};
use serde::Deserialize;
use tracing::debug;

use crate::model::RateRow;

/// Inclusive month window, e.g. Apr 2019 to Feb 2020.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MonthWindow {
    #[serde(with = "crate::reshape::month")]
    pub from: NaiveDate,
    #[serde(with = "crate::reshape::month")]
    pub to: NaiveDate,
}

impl MonthWindow {
    pub fn contains(&self, month: NaiveDate) -> bool {
        self.from <= month && month <= self.to
    }
}

/// Outer boundary rings for one region. Interior holes are dropped; at CCG
/// scale they do not affect the shading.
#[derive(Debug, Clone)]
pub struct RegionShape {
    pub region_id: String,
    pub rings: Vec<Vec<(f64, f64)>>,
}

/// Options for one choropleth rendering. The month window is applied before
/// rendering, by [`window_means`].
#[derive(Debug, Clone)]
pub struct ChoroplethConfig {
    pub title: String,
    pub separate_london: bool,
    pub london_region_ids: Vec<String>,
    pub out_path: PathBuf,
}

/// Mean `items_per_1000` per region over the window. Regions with no rows in
/// the window do not appear (they render unshaded).
pub fn window_means(rows: &[RateRow], window: MonthWindow) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for row in rows {
        if window.contains(row.month) {
            let entry = sums.entry(row.region_id.clone()).or_insert((0.0, 0));
            entry.0 += row.items_per_1000;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(region, (sum, count))| (region, sum / count as f64))
        .collect()
}

/// Load region boundaries from a GeoJSON feature collection. The region id is
/// taken from `region_property` on each feature; features without it or with
/// non-polygon geometry are skipped.
pub fn load_boundaries(path: &Path, region_property: &str) -> Result<Vec<RegionShape>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading boundary file {}", path.display()))?;
    let geojson: GeoJson = raw
        .parse()
        .with_context(|| format!("parsing boundary file {}", path.display()))?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        bail!(
            "boundary file {} is not a feature collection",
            path.display()
        );
    };

    let mut shapes = Vec::new();
    for feature in collection.features {
        let Some(region_id) = feature
            .properties
            .as_ref()
            .and_then(|props| props.get(region_property))
            .and_then(|value| value.as_str())
            .map(str::to_string)
        else {
            debug!(property = region_property, "feature without region id; skipping");
            continue;
        };
        let Some(geometry) = feature.geometry else {
            debug!(%region_id, "feature without geometry; skipping");
            continue;
        };
        let rings = match geometry.value {
            GeoValue::Polygon(polygon) => outer_ring(&polygon).into_iter().collect(),
            GeoValue::MultiPolygon(polygons) => {
                polygons.iter().filter_map(|p| outer_ring(p)).collect()
            }
            _ => {
                debug!(%region_id, "feature with non-polygon geometry; skipping");
                continue;
            }
        };
        shapes.push(RegionShape { region_id, rings });
    }
    if shapes.is_empty() {
        bail!("no usable region boundaries in {}", path.display());
    }
    Ok(shapes)
}

fn outer_ring(polygon: &[Vec<Vec<f64>>]) -> Option<Vec<(f64, f64)>> {
    polygon.first().map(|ring| {
        ring.iter()
            .filter(|pos| pos.len() >= 2)
            .map(|pos| (pos[0], pos[1]))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(m: NaiveDate, region: &str, value: f64) -> RateRow {
        RateRow {
            month: m,
            region_id: region.to_string(),
            total_items: 0,
            list_size: 1,
            items_per_1000: value,
        }
    }

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn window_means_filter_and_average() {
        let window = MonthWindow {
            from: month(2019, 4),
            to: month(2020, 2),
        };
        let rows = vec![
            rate(month(2019, 4), "08H", 2.0),
            rate(month(2019, 5), "08H", 4.0),
            rate(month(2019, 3), "08H", 100.0), // before the window
            rate(month(2020, 3), "09X", 100.0), // after the window
        ];
        let means = window_means(&rows, window);
        assert_eq!(means.len(), 1);
        assert!((means["08H"] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn boundaries_parse_polygons_and_multipolygons() -> Result<()> {
        let geojson = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "code": "08H", "name": "Islington" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
                    }
                },
                {
                    "type": "Feature",
                    "properties": { "code": "09X" },
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [
                            [[[2.0, 0.0], [3.0, 0.0], [3.0, 1.0], [2.0, 0.0]]],
                            [[[4.0, 0.0], [5.0, 0.0], [5.0, 1.0], [4.0, 0.0]]]
                        ]
                    }
                },
                { "type": "Feature", "properties": { "name": "no code" }, "geometry": null }
            ]
        }"#;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("boundaries.geojson");
        std::fs::write(&path, geojson)?;

        let shapes = load_boundaries(&path, "code")?;
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0].region_id, "08H");
        assert_eq!(shapes[0].rings.len(), 1);
        assert_eq!(shapes[0].rings[0].len(), 5);
        assert_eq!(shapes[1].region_id, "09X");
        assert_eq!(shapes[1].rings.len(), 2);
        Ok(())
    }

    #[test]
    fn empty_boundary_file_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("empty.geojson");
        std::fs::write(&path, r#"{ "type": "FeatureCollection", "features": [] }"#)?;
        assert!(load_boundaries(&path, "code").is_err());
        Ok(())
    }
}
