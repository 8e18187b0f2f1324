//! CLI configuration management.
//!
//! Precedence, highest first: command-line flags, environment variables
//! (a `.env` file is honored), the config file, built-in defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use hinge_engine::EngineConfig;
use serde::{Deserialize, Serialize};

/// Application-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding campaign state and turn receipts.
    pub data_dir: PathBuf,

    /// Optional JSON file with engine tuning (cascade, leverage, ...).
    #[serde(default)]
    pub engine_config: Option<PathBuf>,

    /// Overrides the engine's narration timeout.
    #[serde(default)]
    pub narrative_timeout_ms: Option<u64>,

    /// Port for `hinge serve`.
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("hinge"));

        Self {
            data_dir,
            engine_config: None,
            narrative_timeout_ms: None,
            port: 3030,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "hinge", "hinge")
}

impl Config {
    /// Load configuration from environment variables and config file.
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();

        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config from {}", path.display()))?;
                serde_json::from_str(&contents).with_context(|| "Failed to parse config file")?
            }
            _ => Self::default(),
        };

        if let Ok(dir) = std::env::var("HINGE_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("HINGE_ENGINE_CONFIG") {
            config.engine_config = Some(PathBuf::from(path));
        }
        if let Ok(ms) = std::env::var("HINGE_NARRATIVE_TIMEOUT_MS") {
            config.narrative_timeout_ms = Some(
                ms.parse()
                    .with_context(|| format!("HINGE_NARRATIVE_TIMEOUT_MS is not a number: {ms}"))?,
            );
        }
        if let Ok(port) = std::env::var("HINGE_PORT") {
            config.port = port
                .parse()
                .with_context(|| format!("HINGE_PORT is not a port: {port}"))?;
        }

        Ok(config)
    }

    /// Get the path to the config file.
    pub fn config_file_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Engine tuning: the configured file or defaults, with overrides applied.
    pub fn engine(&self) -> Result<EngineConfig> {
        let mut engine = match &self.engine_config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("Failed to load engine config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(ms) = self.narrative_timeout_ms {
            engine.narrative.timeout_ms = ms;
        }
        engine.validate()?;
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_applies_timeout_override() {
        let config = Config {
            narrative_timeout_ms: Some(250),
            ..Config::default()
        };
        let engine = config.engine().unwrap();
        assert_eq!(engine.narrative.timeout_ms, 250);
    }

    #[test]
    fn test_missing_engine_config_is_an_error() {
        let config = Config {
            engine_config: Some(PathBuf::from("/nonexistent/engine.json")),
            ..Config::default()
        };
        assert!(config.engine().is_err());
    }
}
