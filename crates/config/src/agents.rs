//! The agent directory: which remote agent plays which specialist.
//!
//! Read once at startup from a JSON file shaped like
//!
//! ```json
//! {
//!   "cardiologist_agent": { "agent_id": "ABC123", "alias_id": "TSTALIAS" },
//!   "qa_agent":           { "agent_id": "DEF456", "alias_id": "PROD" }
//! }
//! ```
//!
//! and immutable afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use cardiolake_core::{AgentReference, Specialist};

use crate::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentDirectory {
    agents: BTreeMap<String, AgentReference>,
}

impl AgentDirectory {
    pub fn new(agents: BTreeMap<String, AgentReference>) -> Self {
        Self { agents }
    }

    /// Parse the directory from JSON text. Unknown keys are kept.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let agents: BTreeMap<String, AgentReference> = serde_json::from_str(json)
            .map_err(|e| ConfigError::ValidationError(format!("invalid agent config: {e}")))?;
        Ok(Self { agents })
    }

    /// Load the directory from a file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let directory = Self::from_json(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::info!(
            path = %path.display(),
            agents = directory.agents.len(),
            "Loaded agent directory"
        );
        Ok(directory)
    }

    /// Look up an agent by its configuration key.
    pub fn get(&self, name: &str) -> Result<&AgentReference, ConfigError> {
        self.agents
            .get(name)
            .ok_or_else(|| ConfigError::MissingAgent(name.to_string()))
    }

    pub fn specialist(&self, specialist: Specialist) -> Result<&AgentReference, ConfigError> {
        self.get(specialist.config_key())
    }

    /// Specialists that have no entry in this directory.
    pub fn missing(&self) -> Vec<Specialist> {
        Specialist::ALL
            .into_iter()
            .filter(|s| !self.agents.contains_key(s.config_key()))
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
