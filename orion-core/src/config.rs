//! Configuration management for Orion
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (ORION_*)
//! 3. Config file (~/.config/orion/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Language model endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat-completions endpoint
    pub api_url: String,

    /// Model name sent with every request
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Upper bound on completion tokens
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-5-mini".to_string(),
            temperature: 1.0,
            max_tokens: 32768,
        }
    }
}

/// Workflow driver configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Directory that receives repository clones
    pub workdir: Option<PathBuf>,

    /// Retry ceiling for error recovery
    pub max_retries: u32,

    /// Directory for JSON checkpoints; in-memory when unset
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            workdir: None,
            max_retries: 3,
            checkpoint_dir: None,
        }
    }
}

/// Generated-code test configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TestingConfig {
    /// Wall-clock limit for executing one file
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Interpreter used for venv creation and plain runs
    pub python: String,

    /// Conda environment used when no venv is requested
    pub conda_env: String,
}

impl Default for TestingConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            python: "python3".to_string(),
            conda_env: "ml".to_string(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Model configuration
    pub llm: LlmConfig,

    /// Workflow configuration
    pub workflow: WorkflowConfig,

    /// Testing configuration
    pub testing: TestingConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/orion/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("orion").join("config.toml"))
    }

    /// Write the default configuration to `path`, refusing to overwrite
    pub fn write_default(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(Error::Config(format!(
                "Config file already exists at {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }
        let contents = toml::to_string_pretty(&Self::default())
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents).map_err(Error::Io)?;
        Ok(())
    }

    /// Directory that receives clones when none is configured
    ///
    /// Returns `~/.cache/orion/repos`
    pub fn default_workdir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| Error::Config("Could not determine cache directory".to_string()))?;

        Ok(cache_dir.join("orion").join("repos"))
    }

    /// Resolved clone directory
    pub fn workdir(&self) -> Result<PathBuf> {
        match self.workflow.workdir {
            Some(ref dir) => Ok(dir.clone()),
            None => Self::default_workdir(),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - ORION_LLM_API_URL: Chat-completions endpoint
    /// - ORION_MODEL: Model to use
    /// - ORION_WORKDIR: Clone directory
    /// - ORION_CHECKPOINT_DIR: Checkpoint directory
    /// - ORION_PYTHON: Interpreter
    /// - ORION_CONDA_ENV: Conda environment name
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("ORION_LLM_API_URL") {
            self.llm.api_url = url;
        }

        if let Ok(model) = std::env::var("ORION_MODEL") {
            self.llm.model = model;
        }

        if let Ok(dir) = std::env::var("ORION_WORKDIR") {
            self.workflow.workdir = Some(PathBuf::from(dir));
        }

        if let Ok(dir) = std::env::var("ORION_CHECKPOINT_DIR") {
            self.workflow.checkpoint_dir = Some(PathBuf::from(dir));
        }

        if let Ok(python) = std::env::var("ORION_PYTHON") {
            self.testing.python = python;
        }

        if let Ok(env) = std::env::var("ORION_CONDA_ENV") {
            self.testing.conda_env = env;
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, model: Option<String>, workdir: Option<PathBuf>) -> Self {
        if let Some(m) = model {
            self.llm.model = m;
        }

        if let Some(dir) = workdir {
            self.workflow.workdir = Some(dir);
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(model: Option<String>, workdir: Option<PathBuf>) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()
            .with_cli_overrides(model, workdir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.model, "gpt-5-mini");
        assert_eq!(config.workflow.max_retries, 3);
        assert_eq!(config.testing.timeout, Duration::from_secs(60));
        assert!(config.workflow.checkpoint_dir.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default()
            .with_cli_overrides(Some("gpt-5".to_string()), Some(PathBuf::from("/tmp/work")));

        assert_eq!(config.llm.model, "gpt-5");
        assert_eq!(config.workdir().unwrap(), PathBuf::from("/tmp/work"));
    }

    #[test]
    fn test_write_default_roundtrips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("orion/config.toml");

        Config::write_default(&path).unwrap();
        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.llm.model, "gpt-5-mini");
        assert_eq!(loaded.testing.timeout, Duration::from_secs(60));

        assert!(Config::write_default(&path).is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[llm]
api_url = "http://localhost:8080/v1/chat/completions"
model = "local-model"

[workflow]
workdir = "/srv/orion"
max_retries = 5

[testing]
timeout = "2m"
conda_env = "py311"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.llm.api_url, "http://localhost:8080/v1/chat/completions");
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.workflow.workdir, Some(PathBuf::from("/srv/orion")));
        assert_eq!(config.workflow.max_retries, 5);
        assert_eq!(config.testing.timeout, Duration::from_secs(120));
        assert_eq!(config.testing.conda_env, "py311");
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
[llm]
model = "gpt-5-nano"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        // everything else should use defaults
        assert_eq!(config.llm.model, "gpt-5-nano");
        assert_eq!(config.llm.max_tokens, 32768);
        assert_eq!(config.testing.python, "python3");
    }
}
