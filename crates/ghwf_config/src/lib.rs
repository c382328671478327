use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = ".ghwf.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub gh: GhConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Directory holding `workflows/` and `agents/` templates
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GhConfig {
    /// GitHub CLI binary (name on PATH or absolute path)
    #[serde(default = "default_gh_bin")]
    pub bin: String,
}

fn default_gh_bin() -> String {
    "gh".to_string()
}

impl Default for GhConfig {
    fn default() -> Self {
        Self {
            bin: default_gh_bin(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Relative template dirs are relative to the config file
        if let (Some(dir), Some(parent)) = (config.templates.dir.as_ref(), path.parent()) {
            if dir.is_relative() {
                config.templates.dir = Some(parent.join(dir));
            }
        }

        Ok(config)
    }

    /// Loads `.ghwf.toml` from `dir`. A missing file yields the defaults.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }
}
