
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1536;
pub const DEFAULT_TOP_K: u32 = 4;

pub const ENV_TENANT_ID: &str = "SHAREPOINT_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "SHAREPOINT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "SHAREPOINT_CLIENT_SECRET";
pub const ENV_SITE_ID: &str = "SHAREPOINT_SITE_ID";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Microsoft Graph tenant, app registration and target site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GraphConfig {
    pub authority_url: String,
    pub graph_url: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub site_id: String,
    /// Applies to both the token endpoint and Graph requests
    pub timeout_seconds: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            authority_url: "https://login.microsoftonline.com".to_string(),
            graph_url: "https://graph.microsoft.com".to_string(),
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            site_id: String::new(),
            timeout_seconds: crate::http::DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub embedding_model: String,
    pub embedding_dimension: u32,
    pub chat_model: String,
    pub temperature: f32,
    pub batch_size: u32,
    pub timeout_seconds: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            embedding_model: "text-embedding-ada-002".to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            chat_model: "gpt-4".to_string(),
            temperature: 0.0,
            batch_size: 16,
            timeout_seconds: crate::http::DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: u32,
    /// Directory holding `index.bin`; relative paths resolve against the config directory
    pub index_dir: PathBuf,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            index_dir: PathBuf::from("sharepoint_index"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL for {0}: {1}")]
    InvalidUrl(&'static str, String),
    #[error("Invalid model name for {0} (cannot be empty)")]
    InvalidModel(&'static str),
    #[error("Invalid batch size: {0} (must be between 1 and 2048)")]
    InvalidBatchSize(u32),
    #[error("Invalid embedding dimension: {0} (must be between 1 and 8192)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(u32),
    #[error("Missing required setting {0} (set it in config.toml or via {1})")]
    MissingCredential(&'static str, &'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default application directory, `~/.sharepoint-qa`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".sharepoint-qa"))
            .or_else(|| dirs::data_dir().map(|data| data.join("sharepoint-qa")))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from `config_dir`, falling back to defaults when it does not exist,
    /// then apply environment overrides and validate
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let mut config = Self::load_file(config_dir.as_ref())?;
        config.apply_env_overrides();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    fn load_file(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self {
                base_dir: config_dir.to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.to_path_buf();

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Override credentials and identifiers from the process environment
    #[inline]
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| env::var(key).ok());
    }

    /// Override credentials and identifiers using `lookup`; empty values are ignored
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets: [(&str, &mut String); 5] = [
            (ENV_TENANT_ID, &mut self.graph.tenant_id),
            (ENV_CLIENT_ID, &mut self.graph.client_id),
            (ENV_CLIENT_SECRET, &mut self.graph.client_secret),
            (ENV_SITE_ID, &mut self.graph.site_id),
            (ENV_OPENAI_API_KEY, &mut self.openai.api_key),
        ];

        for (key, slot) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                debug!("Using {} from environment", key);
                *slot = value;
            }
        }
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.graph.validate()?;
        self.openai.validate()?;
        self.retrieval.validate()?;
        Ok(())
    }

    /// Ensure every secret and identifier needed to talk to Graph and OpenAI is present
    #[inline]
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        let required = [
            (&self.graph.tenant_id, "graph.tenant_id", ENV_TENANT_ID),
            (&self.graph.client_id, "graph.client_id", ENV_CLIENT_ID),
            (
                &self.graph.client_secret,
                "graph.client_secret",
                ENV_CLIENT_SECRET,
            ),
            (&self.graph.site_id, "graph.site_id", ENV_SITE_ID),
            (&self.openai.api_key, "openai.api_key", ENV_OPENAI_API_KEY),
        ];

        match required.iter().find(|(value, _, _)| value.trim().is_empty()) {
            Some(&(_, name, env_var)) => Err(ConfigError::MissingCredential(name, env_var)),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join(CONFIG_FILE_NAME)
    }

    /// Directory holding the persisted vector index
    #[inline]
    pub fn index_dir_path(&self) -> PathBuf {
        if self.retrieval.index_dir.is_absolute() {
            self.retrieval.index_dir.clone()
        } else {
            self.get_base_dir().join(&self.retrieval.index_dir)
        }
    }

    #[inline]
    pub fn authority_url(&self) -> Result<Url, ConfigError> {
        parse_url("graph.authority_url", &self.graph.authority_url)
    }

    #[inline]
    pub fn graph_url(&self) -> Result<Url, ConfigError> {
        parse_url("graph.graph_url", &self.graph.graph_url)
    }

    #[inline]
    pub fn openai_url(&self) -> Result<Url, ConfigError> {
        parse_url("openai.base_url", &self.openai.base_url)
    }
}

impl GraphConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_url("graph.authority_url", &self.authority_url)?;
        parse_url("graph.graph_url", &self.graph_url)?;

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }
}

impl OpenAiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_url("openai.base_url", &self.base_url)?;

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel("openai.embedding_model"));
        }

        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel("openai.chat_model"));
        }

        if !(1..=8192).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        if !(1..=2048).contains(&self.batch_size) {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    pub fn set_embedding_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel("openai.embedding_model"));
        }
        self.embedding_model = model;
        Ok(())
    }

    pub fn set_chat_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel("openai.chat_model"));
        }
        self.chat_model = model;
        Ok(())
    }

    pub fn set_embedding_dimension(&mut self, dimension: u32) -> Result<(), ConfigError> {
        if !(1..=8192).contains(&dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(dimension));
        }
        self.embedding_dimension = dimension;
        Ok(())
    }

    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if !(1..=2048).contains(&batch_size) {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }
        Ok(())
    }

    pub fn set_top_k(&mut self, top_k: u32) -> Result<(), ConfigError> {
        if !(1..=100).contains(&top_k) {
            return Err(ConfigError::InvalidTopK(top_k));
        }
        self.top_k = top_k;
        Ok(())
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|_| ConfigError::InvalidUrl(name, value.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(name, value.to_string()));
    }
    Ok(url)
}

/// Mask a secret for display, keeping only its last four characters
#[inline]
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return "(not set)".to_string();
    }
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}
