//! Configuration file handling.

pub mod types;

pub use types::{Config, HistogramBuckets, MeasurementConfig, RttBuckets};

use std::path::Path;

use anyhow::Context;

/// Loads a config from a TOML file. An empty file yields the defaults.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("could not load config from {}", path.display()))?;
    parse(&raw)
}

/// Parses a config from a TOML string.
pub fn parse(raw: &str) -> anyhow::Result<Config> {
    toml::from_str(raw).context("could not parse config")
}
