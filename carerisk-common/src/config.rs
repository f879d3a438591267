//! Configuration loading and config file resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CARERISK_CONFIG";

/// Engine configuration read from `config.toml`
///
/// Every section is optional; missing keys fall back to compiled defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite prediction store
    pub database_path: PathBuf,
    pub server: ServerConfig,
    pub model: ModelConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            server: ServerConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5740".to_string(),
        }
    }
}

/// External risk model process settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Executable to spawn (interpreter or standalone binary)
    pub program: String,
    /// Script passed as the first argument, if the program is an interpreter
    pub script: Option<PathBuf>,
    /// Working directory for the model process
    pub working_dir: Option<PathBuf>,
    /// Per-invocation limit; `None` disables the timeout
    pub timeout_secs: Option<u64>,
    /// Maximum number of model processes running at once
    pub max_concurrent: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            script: Some(PathBuf::from("new_patient_risk_prediction.py")),
            working_dir: None,
            timeout_secs: Some(120),
            max_concurrent: 4,
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl EngineConfig {
    /// Load configuration from `path`
    ///
    /// A missing file is not fatal: a warning is logged and defaults are used.
    /// A file that exists but does not parse is a configuration error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file found, using compiled defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.program.trim().is_empty() {
            return Err(Error::Config("model.program must not be empty".to_string()));
        }
        if self.model.max_concurrent == 0 {
            return Err(Error::Config(
                "model.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.model.timeout_secs == Some(0) {
            return Err(Error::Config(
                "model.timeout_secs must be positive (omit it to disable)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Config file resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Platform config directory, if the file exists
pub fn resolve_config_path(cli_arg: Option<&str>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    dirs::config_dir()
        .map(|d| d.join("carerisk").join("config.toml"))
        .filter(|p| p.exists())
}

/// Get OS-dependent default database path
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("carerisk").join("carerisk.db"))
        .unwrap_or_else(|| PathBuf::from("./carerisk_data/carerisk.db"))
}
