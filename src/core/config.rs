/// Generator settings, loadable from RON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::expand::DEFAULT_MAX_DEPTH;
use crate::core::inflect::InflectorKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON write error: {0}")]
    RonWrite(#[from] ron::Error),
}

/// Knobs for a [`Generator`](crate::core::generator::Generator).
///
/// Every field is optional in RON; missing ones take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Seed for the generator's RNG.
    pub seed: u64,
    pub max_depth: usize,
    /// Segments one expansion may visit; `None` for no limit.
    pub step_budget: Option<u64>,
    pub inflector: InflectorKind,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            step_budget: None,
            inflector: InflectorKind::Full,
        }
    }
}

impl GeneratorConfig {
    pub fn from_ron(input: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }
}
