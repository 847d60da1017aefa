//! Converter configuration (TOML).
//!
//! ```toml
//! output_dir = "/data/mast/rdf"
//! map_file = "/data/mast/obsdatahash.map"
//! namespace_root = "http://ads.harvard.edu/sem/context"
//! on_invalid_row = "skip"
//! group_by_day_night = false
//! verify_output = true
//! ```
//!
//! Every key is optional.

use crate::error::{ObsCoreError, Result};
use crate::row::RowLayout;
use crate::uri::{UriScheme, DEFAULT_NAMESPACE_ROOT};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Used when no config file is given on the command line.
pub const DEFAULT_PATH: &str = "mast/default.toml";

/// File name of the observation→datum map when `map_file` is not set.
pub const DEFAULT_MAP_FILE: &str = "obsdatahash.map";

/// What to do with a row that lacks `obs_id` or `access_url`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidRowPolicy {
    /// Stop the run before any file is written.
    #[default]
    Abort,
    /// Log the row, count it, carry on.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    pub output_dir: PathBuf,
    pub map_file: Option<PathBuf>,
    pub namespace_root: String,
    pub on_invalid_row: InvalidRowPolicy,
    /// Split observations by the `_d` / `_a` day-night file markers.
    pub group_by_day_night: bool,
    /// Re-parse each written graph.
    pub verify_output: bool,
    /// Column order of the input file, when it differs from the standard one.
    pub columns: Option<Vec<String>>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            map_file: None,
            namespace_root: DEFAULT_NAMESPACE_ROOT.to_string(),
            on_invalid_row: InvalidRowPolicy::default(),
            group_by_day_night: false,
            verify_output: false,
            columns: None,
        }
    }
}

impl ConvertConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ObsCoreError::Configuration(e.to_string()))?;
        // fail on a bad layout now rather than after reading the input
        config.row_layout()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ObsCoreError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text).map_err(|e| match e {
            ObsCoreError::Configuration(msg) => {
                ObsCoreError::Configuration(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn map_file_path(&self) -> PathBuf {
        self.map_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join(DEFAULT_MAP_FILE))
    }

    pub fn row_layout(&self) -> Result<RowLayout> {
        match &self.columns {
            Some(names) => RowLayout::from_names(names),
            None => Ok(RowLayout::default()),
        }
    }

    pub fn uri_scheme(&self) -> UriScheme {
        UriScheme::new(self.namespace_root.as_str())
    }
}
