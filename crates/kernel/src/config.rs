use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Engine configuration, usually loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reissue freed entity ids, lowest first.
    pub entity_recycling: bool,
    /// Upper bound on the delta handed to scripts in one tick, in seconds.
    pub max_delta_seconds: f64,
    pub debug: DebugConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            entity_recycling: false,
            max_delta_seconds: 0.25,
            debug: DebugConfig::default(),
        }
    }
}

/// Initial values for the runtime debug toggles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub enabled: bool,
    pub show_fps: bool,
    /// Named boolean flags consumed by presentation layers.
    pub flags: BTreeMap<String, bool>,
}

impl EngineConfig {
    /// Parse a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, EngineError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&data)
    }

    /// Serialize back to YAML, defaults included.
    pub fn to_yaml(&self) -> Result<String, EngineError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
