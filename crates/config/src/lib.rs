//! Configuration loading, validation, and management for CardioLake.
//!
//! Loads configuration from `~/.cardiolake/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! The agent directory (which remote agent answers for which specialist) is a
//! separate JSON file, see [`agents::AgentDirectory`].

pub mod agents;

pub use agents::AgentDirectory;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.cardiolake/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// AWS region and credentials
    #[serde(default)]
    pub aws: AwsConfig,

    /// FHIR datastore settings
    #[serde(default)]
    pub healthlake: HealthLakeConfig,

    /// Agent runtime settings
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

fn default_region() -> String {
    "us-west-2".into()
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
        }
    }
}

impl std::fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("session_token", &redact(&self.session_token))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthLakeConfig {
    #[serde(default)]
    pub datastore_id: String,

    /// Override the datastore base URL (ends in `/r4/`). Derived from region
    /// and datastore id when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// `_count` for the patient list.
    #[serde(default = "default_patient_page_size")]
    pub patient_page_size: u32,

    /// `_count` for each category lookup in a patient summary.
    #[serde(default = "default_category_count")]
    pub category_count: u32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_patient_page_size() -> u32 {
    100
}
fn default_category_count() -> u32 {
    10
}
fn default_request_timeout() -> u64 {
    60
}

impl Default for HealthLakeConfig {
    fn default() -> Self {
        Self {
            datastore_id: String::new(),
            endpoint: None,
            patient_page_size: default_patient_page_size(),
            category_count: default_category_count(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl HealthLakeConfig {
    /// The datastore base URL, always ending in `/`.
    pub fn base_url(&self, region: &str) -> String {
        match &self.endpoint {
            Some(url) => format!("{}/", url.trim_end_matches('/')),
            None => format!(
                "https://healthlake.{region}.amazonaws.com/datastore/{}/r4/",
                self.datastore_id
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Path to the agent directory JSON.
    #[serde(default = "default_agent_config_path")]
    pub config_path: String,

    /// Override the agent runtime base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Agent replies can take minutes.
    #[serde(default = "default_agent_timeout")]
    pub request_timeout_secs: u64,
}

fn default_agent_config_path() -> String {
    "agent_config.json".into()
}
fn default_agent_timeout() -> u64 {
    300
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            config_path: default_agent_config_path(),
            endpoint: None,
            request_timeout_secs: default_agent_timeout(),
        }
    }
}

impl AgentsConfig {
    pub fn base_url(&self, region: &str) -> String {
        match &self.endpoint {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-agent-runtime.{region}.amazonaws.com"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Origins allowed by CORS.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".into(),
        "http://localhost:8501".into(),
    ]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.cardiolake/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `AWS_REGION`, `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`
    /// - `HEALTHLAKE_DATASTORE_ID`
    /// - `CARDIOLAKE_AGENT_CONFIG`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(region) = lookup("AWS_REGION") {
            self.aws.region = region;
        }
        if let Some(key) = lookup("AWS_ACCESS_KEY_ID") {
            self.aws.access_key_id = Some(key);
        }
        if let Some(secret) = lookup("AWS_SECRET_ACCESS_KEY") {
            self.aws.secret_access_key = Some(secret);
        }
        if let Some(token) = lookup("AWS_SESSION_TOKEN") {
            self.aws.session_token = Some(token);
        }
        if let Some(id) = lookup("HEALTHLAKE_DATASTORE_ID") {
            self.healthlake.datastore_id = id;
        }
        if let Some(path) = lookup("CARDIOLAKE_AGENT_CONFIG") {
            self.agents.config_path = path;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".cardiolake")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aws.region.trim().is_empty() {
            return Err(ConfigError::ValidationError("aws.region must not be empty".into()));
        }

        if self.healthlake.patient_page_size == 0 || self.healthlake.category_count == 0 {
            return Err(ConfigError::ValidationError(
                "healthlake page sizes must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Whether static credentials are configured (otherwise nothing can be signed).
    pub fn has_credentials(&self) -> bool {
        self.aws.access_key_id.is_some() && self.aws.secret_access_key.is_some()
    }

    /// The datastore base URL for the configured region.
    pub fn healthlake_url(&self) -> String {
        self.healthlake.base_url(&self.aws.region)
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            aws: AwsConfig::default(),
            healthlake: HealthLakeConfig::default(),
            agents: AgentsConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("No agent configured for '{0}'")]
    MissingAgent(String),
}
