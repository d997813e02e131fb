//! Run configuration: dataset location, request columns and override sources.
//!
//! Loaded once from an optional JSON file, then treated as immutable.

use crate::gazetteer::{GazetteerError, OverrideTable, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const GEONAMES_CITIES5000_URL: &str = "https://download.geonames.org/export/dump/cities5000.zip";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub url: String,
    pub cache_dir: PathBuf,
    pub archive_name: String,
    pub member_name: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            url: GEONAMES_CITIES5000_URL.into(),
            cache_dir: default_cache_dir(),
            archive_name: "cities5000.zip".into(),
            member_name: "cities5000.txt".into(),
            user_agent: concat!("birthplace-coords/", env!("CARGO_PKG_VERSION"), " (tooling)").into(),
            timeout_secs: 120,
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("birthplaces")
        .join("geonames")
}

/// CSV column names for the request source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub identifier: String,
    pub city: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            identifier: "name".into(),
            city: "birth.cty".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub columns: ColumnConfig,
    /// Extra overrides merged over the built-in table.
    pub overrides_path: Option<PathBuf>,
    /// Skip the built-in override table entirely.
    pub no_builtin_overrides: bool,
}

impl Config {
    /// Read a config file; a missing path yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let data = fs::read_to_string(p)?;
                Ok(serde_json::from_str(&data)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Assemble the override table this config describes.
    pub fn overrides(&self) -> Result<OverrideTable> {
        let mut table = if self.no_builtin_overrides {
            OverrideTable::empty()
        } else {
            OverrideTable::builtin()
        };
        if let Some(ref path) = self.overrides_path {
            let extra = OverrideTable::from_path(path).map_err(|e| {
                GazetteerError::Config(format!("overrides file {}: {}", path.display(), e))
            })?;
            tracing::info!(path = %path.display(), entries = extra.len(), "loaded override file");
            table.extend(extra);
        }
        Ok(table)
    }
}
