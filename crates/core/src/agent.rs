//! Remote agents — references, roles, and the runtime trait.
//!
//! An agent is a managed LLM endpoint addressed by an (agent id, alias id)
//! pair. The runtime streams the reply back as fragments; callers concatenate
//! them in delivery order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Address of a remote agent. Loaded once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentReference {
    pub agent_id: String,
    pub alias_id: String,
}

impl AgentReference {
    pub fn new(agent_id: impl Into<String>, alias_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            alias_id: alias_id.into(),
        }
    }
}

/// The pre-configured agents this workspace knows how to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialist {
    Cardiologist,
    Radiologist,
    Endocrinologist,
    Orchestrator,
    Qa,
}

impl Specialist {
    pub const ALL: [Specialist; 5] = [
        Self::Cardiologist,
        Self::Radiologist,
        Self::Endocrinologist,
        Self::Orchestrator,
        Self::Qa,
    ];

    /// Key in the agent configuration file.
    pub fn config_key(&self) -> &'static str {
        match self {
            Self::Cardiologist => "cardiologist_agent",
            Self::Radiologist => "radiologist_agent",
            Self::Endocrinologist => "endocrinologist_agent",
            Self::Orchestrator => "orchestrator_agent",
            Self::Qa => "qa_agent",
        }
    }

    /// Name of the report this agent produces.
    pub fn report_name(&self) -> &'static str {
        match self {
            Self::Cardiologist => "cardiology",
            Self::Radiologist => "radiology",
            Self::Endocrinologist => "endocrinology",
            Self::Orchestrator => "comprehensive",
            Self::Qa => "qa",
        }
    }
}

impl std::fmt::Display for Specialist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.config_key())
    }
}

/// A single piece of a streamed agent reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFragment {
    /// Text carried by this fragment (may be empty on the final one).
    #[serde(default)]
    pub text: String,

    /// Set on the fragment that signals completion.
    #[serde(default)]
    pub done: bool,
}

impl ResponseFragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            done: false,
        }
    }

    pub fn done() -> Self {
        Self {
            text: String::new(),
            done: true,
        }
    }
}

/// Receiver half of a streamed agent reply.
pub type FragmentStream =
    tokio::sync::mpsc::Receiver<std::result::Result<ResponseFragment, AgentError>>;

/// The agent runtime.
///
/// `invoke` returns once the request was accepted; fragments then arrive on the
/// returned channel in the order the runtime delivered them. A fragment with
/// `done = true` (or the channel closing) marks completion.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// A human-readable name for this runtime (e.g., "bedrock-agent-runtime").
    fn name(&self) -> &str;

    async fn invoke(
        &self,
        agent: &AgentReference,
        session_id: &str,
        input_text: &str,
    ) -> std::result::Result<FragmentStream, AgentError>;
}
