//! Pipeline configuration.
//!
//! Everything the run needs (endpoint, cache locations, policies, chart and
//! map options) is carried here explicitly; nothing reads process-wide
//! defaults. Loaded from YAML at `RXRATES_CONFIG` (default `rxrates.yaml`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::fetch::cache::StaleCachePolicy;
use crate::map::MonthWindow;
use crate::queries::BnfSelection;
use crate::reshape::MergePolicy;

pub const CONFIG_ENV: &str = "RXRATES_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "rxrates.yaml";

#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    /// Analytical store query endpoint.
    pub endpoint: String,
    /// Environment variable holding the API key; unset means anonymous.
    #[serde(default = "defaults::api_key_env")]
    pub api_key_env: String,
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub stale_cache: StaleCachePolicy,
    #[serde(default)]
    pub merge: MergePolicy,
    #[serde(default)]
    pub bnf: BnfSelection,
    /// Region overlaid on the decile chart.
    #[serde(default = "defaults::highlight_region")]
    pub highlight_region: String,
    #[serde(default)]
    pub chart: ChartSection,
    pub map: MapSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ChartSection {
    pub title: String,
    pub show_outer_percentiles: bool,
    pub file_name: String,
}

impl Default for ChartSection {
    fn default() -> Self {
        Self {
            title: "Items per 1000 registered patients".to_string(),
            show_outer_percentiles: false,
            file_name: "deciles.svg".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MapSection {
    /// GeoJSON feature collection of region boundaries.
    pub boundaries: PathBuf,
    /// Feature property carrying the region id.
    #[serde(default = "defaults::region_property")]
    pub region_property: String,
    #[serde(default = "defaults::map_title")]
    pub title: String,
    #[serde(default = "defaults::map_file_name")]
    pub file_name: String,
    pub window: MonthWindow,
    #[serde(default)]
    pub separate_london: bool,
    #[serde(default)]
    pub london_region_ids: Vec<String>,
}

mod defaults {
    use std::path::PathBuf;

    pub fn api_key_env() -> String {
        "RXRATES_API_KEY".to_string()
    }
    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn output_dir() -> PathBuf {
        PathBuf::from("charts")
    }
    pub fn highlight_region() -> String {
        "08H".to_string()
    }
    pub fn region_property() -> String {
        "code".to_string()
    }
    pub fn map_title() -> String {
        "Items per 1000 registered patients".to_string()
    }
    pub fn map_file_name() -> String {
        "choropleth.svg".to_string()
    }
}

impl PipelineConfig {
    /// Load from the path in `RXRATES_CONFIG`, falling back to
    /// `rxrates.yaml` in the working directory.
    pub fn load_default() -> Result<Self> {
        let path =
            std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(Path::new(&path))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: PipelineConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// API key from the configured environment variable, if set.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}
