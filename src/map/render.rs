//! SVG rendering for the regional choropleth via plotters.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use plotters::prelude::*;
use tracing::{info, warn};

use super::{ChoroplethConfig, RegionShape};

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 700;
const LEGEND_HEIGHT: i32 = 56;
const LONDON_PANEL_WIDTH: i32 = 300;
const NO_DATA: RGBColor = RGBColor(224, 224, 224);

/// Shade `shapes` by the per-region values, writing an SVG to the configured
/// path. Regions without a value render grey. With `separate_london`, the
/// configured London regions move to their own panel on the right.
pub fn choropleth(
    shapes: &[RegionShape],
    values: &BTreeMap<String, f64>,
    config: &ChoroplethConfig,
) -> Result<()> {
    if values.is_empty() {
        bail!("no rate values inside the map window");
    }
    let (min, max) = values
        .values()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let matched = shapes
        .iter()
        .filter(|s| values.contains_key(&s.region_id))
        .count();
    if matched == 0 {
        bail!("no boundary region id matches any rate row");
    }
    if matched < values.len() {
        warn!(
            regions = values.len() - matched,
            "rate rows without a boundary shape"
        );
    }

    let root = SVGBackend::new(&config.out_path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(config.title.as_str(), ("sans-serif", 22))?;

    let (_, height) = root.dim_in_pixel();
    let (map_area, legend_area) = root.split_vertically(height as i32 - LEGEND_HEIGHT);

    let (london, rest): (Vec<&RegionShape>, Vec<&RegionShape>) = shapes
        .iter()
        .partition(|s| config.london_region_ids.contains(&s.region_id));

    if config.separate_london && !london.is_empty() {
        let (main_panel, london_panel) = {
            let (w, _) = map_area.dim_in_pixel();
            map_area.split_horizontally(w as i32 - LONDON_PANEL_WIDTH)
        };
        draw_panel(&main_panel, &rest, values, min, max)?;
        draw_panel(&london_panel, &london, values, min, max)?;
        london_panel.draw(&Text::new(
            "London",
            (10, 10),
            ("sans-serif", 16).into_font(),
        ))?;
    } else {
        let all: Vec<&RegionShape> = shapes.iter().collect();
        draw_panel(&map_area, &all, values, min, max)?;
    }

    draw_legend(&legend_area, min, max)?;

    root.present()
        .with_context(|| format!("writing choropleth to {}", config.out_path.display()))?;
    info!(path = %config.out_path.display(), regions = matched, "wrote choropleth");
    Ok(())
}

/// Fit the shapes into one panel (aspect-preserving) and fill each ring by
/// its region's value.
fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    shapes: &[&RegionShape],
    values: &BTreeMap<String, f64>,
    min: f64,
    max: f64,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    if shapes.is_empty() {
        return Ok(());
    }
    let (w, h) = area.dim_in_pixel();
    let project = projector(shapes, w as f64, h as f64, 12.0);

    for shape in shapes {
        let style = match values.get(&shape.region_id) {
            Some(&v) => ramp_color(v, min, max).filled(),
            None => NO_DATA.filled(),
        };
        for ring in &shape.rings {
            let px: Vec<(i32, i32)> = ring.iter().map(|&(lon, lat)| project(lon, lat)).collect();
            area.draw(&Polygon::new(px.clone(), style))
                .map_err(|e| anyhow::anyhow!("drawing region {}: {}", shape.region_id, e))?;
            area.draw(&PathElement::new(px, WHITE.stroke_width(1)))
                .map_err(|e| anyhow::anyhow!("outlining region {}: {}", shape.region_id, e))?;
        }
    }
    Ok(())
}

/// Lon/lat → panel pixels, preserving aspect ratio, north up.
fn projector(
    shapes: &[&RegionShape],
    width: f64,
    height: f64,
    margin: f64,
) -> impl Fn(f64, f64) -> (i32, i32) {
    let mut min_lon = f64::INFINITY;
    let mut max_lon = f64::NEG_INFINITY;
    let mut min_lat = f64::INFINITY;
    let mut max_lat = f64::NEG_INFINITY;
    for shape in shapes {
        for ring in &shape.rings {
            for &(lon, lat) in ring {
                min_lon = min_lon.min(lon);
                max_lon = max_lon.max(lon);
                min_lat = min_lat.min(lat);
                max_lat = max_lat.max(lat);
            }
        }
    }
    let d_lon = (max_lon - min_lon).max(1e-9);
    let d_lat = (max_lat - min_lat).max(1e-9);
    let scale = ((width - 2.0 * margin) / d_lon).min((height - 2.0 * margin) / d_lat);
    let x_off = (width - d_lon * scale) / 2.0;
    let y_off = (height - d_lat * scale) / 2.0;

    move |lon, lat| {
        let x = x_off + (lon - min_lon) * scale;
        let y = y_off + (max_lat - lat) * scale;
        (x as i32, y as i32)
    }
}

/// Sequential light-to-dark blue ramp over [min, max].
pub fn ramp_color(value: f64, min: f64, max: f64) -> HSLColor {
    let t = if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    HSLColor(0.58, 0.62, 0.92 - 0.62 * t)
}

fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    min: f64,
    max: f64,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let (w, _) = area.dim_in_pixel();
    let segments = 48;
    let bar_width = (w as i32 - 240).max(segments);
    let x0 = 120;
    let seg_w = bar_width / segments;
    for i in 0..segments {
        let t = i as f64 / (segments - 1) as f64;
        let color = ramp_color(min + t * (max - min), min, max);
        area.draw(&Rectangle::new(
            [(x0 + i * seg_w, 12), (x0 + (i + 1) * seg_w, 32)],
            color.filled(),
        ))
        .map_err(|e| anyhow::anyhow!("drawing legend: {}", e))?;
    }
    area.draw(&Text::new(
        format!("{min:.1}"),
        (x0 - 50, 18),
        ("sans-serif", 14).into_font(),
    ))
    .map_err(|e| anyhow::anyhow!("drawing legend label: {}", e))?;
    area.draw(&Text::new(
        format!("{max:.1}"),
        (x0 + bar_width + 10, 18),
        ("sans-serif", 14).into_font(),
    ))
    .map_err(|e| anyhow::anyhow!("drawing legend label: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_spans_light_to_dark() {
        let lo = ramp_color(0.0, 0.0, 10.0);
        let hi = ramp_color(10.0, 0.0, 10.0);
        assert!(lo.2 > hi.2, "low values must be lighter than high values");
        let mid = ramp_color(5.0, 0.0, 10.0);
        assert!(mid.2 < lo.2 && mid.2 > hi.2);
    }

    #[test]
    fn ramp_handles_degenerate_range() {
        let c = ramp_color(3.0, 3.0, 3.0);
        assert!(c.2 > 0.0 && c.2 < 1.0);
    }

    #[test]
    fn projector_preserves_orientation() {
        let shape = RegionShape {
            region_id: "08H".to_string(),
            rings: vec![vec![(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (0.0, 1.0)]],
        };
        let shapes = vec![&shape];
        let project = projector(&shapes, 200.0, 100.0, 0.0);
        let (x0, y0) = project(0.0, 1.0); // north-west corner
        let (x1, y1) = project(2.0, 0.0); // south-east corner
        assert!(x0 < x1);
        assert!(y0 < y1, "north must map to the top of the panel");
    }
}
