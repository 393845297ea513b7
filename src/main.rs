use anyhow::{Context, Result};
use rxrates::{
    chart::{render::deciles_chart, DecilesChartConfig},
    config::PipelineConfig,
    fetch::{cache::cached_read, HttpQueryStore},
    map::{self, render::choropleth, ChoroplethConfig},
    model::{PopulationRow, PrescribingRow},
    queries, reshape,
};
use std::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) load config, prepare dirs ────────────────────────────────
    let config = PipelineConfig::load_default()?;
    for dir in [&config.data_dir, &config.output_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating directory {}", dir.display()))?;
    }

    // ─── 3) cached query fetch ───────────────────────────────────────
    let store = HttpQueryStore::new(&config.endpoint, config.api_key())?;

    let prescribing: Vec<PrescribingRow> = cached_read(
        &store,
        &queries::prescribing_sql(&config.bnf),
        &config.data_dir.join("prescribing.csv"),
        config.stale_cache,
    )
    .await?;
    info!(rows = prescribing.len(), "prescribing result ready");

    let population: Vec<PopulationRow> = cached_read(
        &store,
        &queries::list_size_sql(),
        &config.data_dir.join("list_size.csv"),
        config.stale_cache,
    )
    .await?;
    info!(rows = population.len(), "list size result ready");

    // ─── 4) reshape: totals, merge, rates ────────────────────────────
    let totals = reshape::monthly_totals(&prescribing);
    let rates = reshape::merge_with_population(totals, &population, config.merge)?;
    info!(rows = rates.len(), "joined rate rows");

    // ─── 5) decile chart with highlighted region ─────────────────────
    let points: Vec<_> = rates.iter().map(|r| (r.month, r.items_per_1000)).collect();
    let highlight: Vec<_> = rates
        .iter()
        .filter(|r| r.region_id == config.highlight_region)
        .map(|r| (r.month, r.items_per_1000))
        .collect();
    deciles_chart(
        &points,
        &highlight,
        &DecilesChartConfig {
            title: config.chart.title.clone(),
            y_label: "Items per 1000".to_string(),
            highlight_label: Some(config.highlight_region.clone()),
            show_outer_percentiles: config.chart.show_outer_percentiles,
            out_path: config.output_dir.join(&config.chart.file_name),
        },
    )?;

    // ─── 6) choropleth over the configured window ────────────────────
    let shapes = map::load_boundaries(&config.map.boundaries, &config.map.region_property)?;
    let means = map::window_means(&rates, config.map.window);
    let window = config.map.window;
    choropleth(
        &shapes,
        &means,
        &ChoroplethConfig {
            title: format!(
                "{} ({} to {})",
                config.map.title,
                window.from.format("%b %Y"),
                window.to.format("%b %Y")
            ),
            separate_london: config.map.separate_london,
            london_region_ids: config.map.london_region_ids.clone(),
            out_path: config.output_dir.join(&config.map.file_name),
        },
    )?;

    info!("all done");
    Ok(())
}
