//! Engine configuration, stored as TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// What `build_graph` does when one stable model cannot be explained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The first evaluator failure fails the whole build.
    #[default]
    Abort,
    /// Log the failing model and merge the others.
    Skip,
}

/// Settings of a [`crate::justify::Justifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JustifyConfig {
    /// Iteration cap handed to the recursion solver.
    #[serde(default = "default_max_recursion_iterations")]
    pub max_recursion_iterations: usize,
    /// Build the chains of different stable models on the rayon pool.
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub on_model_failure: FailurePolicy,
}

fn default_max_recursion_iterations() -> usize {
    1000
}

impl Default for JustifyConfig {
    fn default() -> Self {
        Self {
            max_recursion_iterations: default_max_recursion_iterations(),
            parallel: false,
            on_model_failure: FailurePolicy::default(),
        }
    }
}

impl JustifyConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_recursion_iterations == 0 {
            return Err(ConfigError::Invalid {
                message: "max_recursion_iterations must be > 0".into(),
            });
        }
        Ok(())
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}
