use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::qa::QueryStrategy;

/// Environment variable consulted before the config file for the Groq key.
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScholarQaConfig {
    #[serde(default)]
    pub api_keys: ApiKeysConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    #[serde(default)]
    pub groq: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    #[serde(default)]
    pub query_strategy: QueryStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_results() -> usize {
    3
}
fn default_cache_capacity() -> usize {
    256
}
fn default_model() -> String {
    "mixtral-8x7b-32768".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_max_retries() -> u32 {
    3
}

impl Default for ScholarQaConfig {
    fn default() -> Self {
        Self {
            api_keys: ApiKeysConfig::default(),
            search: SearchConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            cache_capacity: default_cache_capacity(),
            query_strategy: QueryStrategy::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
        }
    }
}

impl ScholarQaConfig {
    /// Load config from ~/.config/scholarqa/config.toml, creating defaults if missing.
    pub fn load() -> crate::error::Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(|e| {
                crate::error::QaError::Config(format!("Failed to read config: {e}"))
            })?;
            let config: ScholarQaConfig = toml::from_str(&contents).map_err(|e| {
                crate::error::QaError::Config(format!("Failed to parse config: {e}"))
            })?;
            Ok(config)
        } else {
            let config = ScholarQaConfig::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save config to disk.
    pub fn save(&self) -> crate::error::Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| {
            crate::error::QaError::Config(format!("Failed to serialize config: {e}"))
        })?;
        std::fs::write(&config_path, contents)?;
        Ok(())
    }

    /// Get the config file path.
    pub fn config_path() -> crate::error::Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            crate::error::QaError::Config("Could not determine config directory".into())
        })?;
        Ok(config_dir.join("scholarqa").join("config.toml"))
    }

    /// Resolve the Groq API key: the environment wins, then the config
    /// file. The key must be supplied externally; there is no built-in
    /// fallback, and absence is a hard configuration error.
    pub fn resolve_groq_api_key(&self) -> crate::error::Result<String> {
        if let Ok(key) = std::env::var(GROQ_API_KEY_ENV) {
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok(key);
            }
        }
        let key = self.api_keys.groq.trim().to_string();
        if !key.is_empty() {
            return Ok(key);
        }
        Err(crate::error::QaError::Config(format!(
            "No Groq API key configured. Set {GROQ_API_KEY_ENV} or add it under [api_keys] in the config file."
        )))
    }
}
