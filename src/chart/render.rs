//! SVG rendering for decile charts via plotters.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use tracing::info;

use super::{decile_series, DecilesChartConfig};

const WIDTH: u32 = 900;
const HEIGHT: u32 = 500;

/// Render the decile chart for `points` (one observation per region per
/// month), overlaying `highlight` as a dashed red line.
pub fn deciles_chart(
    points: &[(NaiveDate, f64)],
    highlight: &[(NaiveDate, f64)],
    config: &DecilesChartConfig,
) -> Result<()> {
    let series = decile_series(points, config.show_outer_percentiles);
    let months: Vec<NaiveDate> = match series.first() {
        Some(first) if !first.points.is_empty() => {
            first.points.iter().map(|(m, _)| *m).collect()
        }
        _ => bail!("no observations to chart"),
    };

    let y_max = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(_, v)| *v))
        .chain(highlight.iter().map(|(_, v)| *v))
        .fold(0.0f64, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.05 } else { 1.0 };
    let x_max = (months.len() - 1).max(1) as f64;

    let root = SVGBackend::new(&config.out_path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&config.title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(42)
        .y_label_area_size(56)
        .build_cartesian_2d(0f64..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_labels(months.len().min(12))
        .x_label_formatter(&|x| {
            let idx = x.round() as usize;
            months
                .get(idx)
                .map(|m| m.format("%Y-%m").to_string())
                .unwrap_or_default()
        })
        .y_desc(config.y_label.clone())
        .draw()?;

    let mut median_labelled = false;
    let mut decile_labelled = false;
    for s in &series {
        let pts: Vec<(f64, f64)> = s
            .points
            .iter()
            .enumerate()
            .map(|(i, (_, v))| (i as f64, *v))
            .collect();
        if s.percentile == 50 {
            let drawn = chart.draw_series(LineSeries::new(pts, BLUE.stroke_width(2)))?;
            if !median_labelled {
                drawn.label("Median").legend(|(x, y)| {
                    PathElement::new(vec![(x, y), (x + 18, y)], BLUE.stroke_width(2))
                });
                median_labelled = true;
            }
        } else if s.percentile % 10 == 0 {
            let drawn =
                chart.draw_series(DashedLineSeries::new(pts, 4, 3, BLUE.stroke_width(1)))?;
            if !decile_labelled {
                drawn.label("Deciles").legend(|(x, y)| {
                    PathElement::new(vec![(x, y), (x + 18, y)], BLUE.stroke_width(1))
                });
                decile_labelled = true;
            }
        } else {
            // outer percentiles: faint dotted context
            chart.draw_series(DashedLineSeries::new(
                pts,
                1,
                4,
                BLUE.mix(0.4).stroke_width(1),
            ))?;
        }
    }

    if !highlight.is_empty() {
        let index_of: std::collections::HashMap<NaiveDate, usize> = months
            .iter()
            .enumerate()
            .map(|(i, &m)| (m, i))
            .collect();
        let mut pts: Vec<(f64, f64)> = highlight
            .iter()
            .filter_map(|(m, v)| index_of.get(m).map(|&i| (i as f64, *v)))
            .collect();
        pts.sort_by(|a, b| a.0.total_cmp(&b.0));
        let label = config
            .highlight_label
            .clone()
            .unwrap_or_else(|| "Highlighted region".to_string());
        chart
            .draw_series(DashedLineSeries::new(pts, 6, 4, RED.stroke_width(2)))?
            .label(label)
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], RED.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK.mix(0.4))
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()
        .with_context(|| format!("writing chart to {}", config.out_path.display()))?;
    info!(path = %config.out_path.display(), "wrote decile chart");
    Ok(())
}
