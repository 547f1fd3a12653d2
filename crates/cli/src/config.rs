use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use api_client::{ApiConfig, DEFAULT_BASE_URL};
use catalog::SEARCH_DEBOUNCE;
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub version: u32,
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub search_debounce_ms: u64,
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            search_debounce_ms: SEARCH_DEBOUNCE.as_millis() as u64,
            user_agent: "tracklist/0.1".to_string(),
        }
    }
}

impl CatalogConfig {
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "yaml error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

pub fn config_path_from_env() -> PathBuf {
    match env::var("TRACKLIST_CONFIG") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => default_config_path(),
    }
}

/// `TRACKLIST_API_URL` wins over the configured base URL.
pub fn api_url_from_env() -> Option<String> {
    env::var("TRACKLIST_API_URL")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn default_config_path() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(|dir| dir.join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from("config.yaml")),
        Err(_) => PathBuf::from("config.yaml"),
    }
}

pub fn load_or_create_config(path: &Path) -> Result<(CatalogConfig, bool), ConfigError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let mut config: CatalogConfig = serde_yaml::from_str(&contents)?;
        if config.version < CONFIG_VERSION {
            config.version = CONFIG_VERSION;
        }
        if config.api_url.trim().is_empty() {
            config.api_url = DEFAULT_BASE_URL.to_string();
        }
        if config.request_timeout_secs == 0 {
            config.request_timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        if config.search_debounce_ms == 0 {
            config.search_debounce_ms = SEARCH_DEBOUNCE.as_millis() as u64;
        }
        if config.user_agent.trim().is_empty() {
            config.user_agent = CatalogConfig::default().user_agent;
        }
        return Ok((config, false));
    }

    let config = CatalogConfig::default();
    save_config(path, &config)?;
    Ok((config, true))
}

pub fn save_config(path: &Path, config: &CatalogConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}
