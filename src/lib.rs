//! Prescribing rates pipeline: cached analytical queries, a reshape stage
//! (monthly totals, population merge, per-1000 rates), and SVG presentation
//! (decile chart, regional choropleth).

pub mod chart;
pub mod config;
pub mod fetch;
pub mod map;
pub mod model;
pub mod queries;
pub mod reshape;
