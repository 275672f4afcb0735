//! TOML configuration parsing and validation.
//!
//! Configuration is loaded once at startup and validated eagerly so a
//! misconfigured deployment fails fast with a clear error instead of
//! failing on first use. Secrets (the LLM API key) are never stored in the
//! file; the config names the environment variable that holds them.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::extract::UnsupportedPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory for raw uploaded note files,
    /// laid out `{root}/{owner_id}/{course_id}/{file_name}`.
    pub root: PathBuf,
    /// Base URL prepended to note paths in listings and the context manifest.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_public_base_url() -> String {
    "http://localhost:8080/files".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_llm_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    /// Hard cap on the assembled context bundle, in characters.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    60_000
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExtractConfig {
    /// Policy for unrecognized file extensions: `reject` (default) or `empty`.
    #[serde(default)]
    pub unsupported: UnsupportedSetting,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedSetting {
    #[default]
    Reject,
    Empty,
}

impl From<UnsupportedSetting> for UnsupportedPolicy {
    fn from(s: UnsupportedSetting) -> Self {
        match s {
            UnsupportedSetting::Reject => UnsupportedPolicy::Reject,
            UnsupportedSetting::Empty => UnsupportedPolicy::Empty,
        }
    }
}

impl Config {
    pub fn unsupported_policy(&self) -> UnsupportedPolicy {
        self.extract.unsupported.into()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.server.bind.is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.context.max_chars == 0 {
        anyhow::bail!("context.max_chars must be > 0");
    }

    if config.llm.endpoint.is_empty() || config.llm.model.is_empty() {
        anyhow::bail!("llm.endpoint and llm.model must not be empty");
    }

    if config.storage.public_base_url.ends_with('/') {
        anyhow::bail!("storage.public_base_url must not end with '/'");
    }

    Ok(config)
}
