//! Send a prompt to a named agent and collect the whole reply.

use std::sync::Arc;

use cardiolake_config::AgentDirectory;
use cardiolake_core::agent::{AgentReference, AgentRuntime, FragmentStream, Specialist};
use cardiolake_core::error::AgentError;
use tracing::{debug, info};
use uuid::Uuid;

use crate::envelope::AgentReply;

/// A fresh runtime session id. Every invocation gets its own so agents carry
/// no memory between calls; context travels in the prompt.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Concatenate fragments in delivery order until the runtime signals
/// completion. The first error aborts the collection.
pub async fn collect_reply(mut stream: FragmentStream) -> Result<String, AgentError> {
    let mut text = String::new();
    while let Some(item) = stream.recv().await {
        let fragment = item?;
        text.push_str(&fragment.text);
        if fragment.done {
            break;
        }
    }
    Ok(text)
}

/// Resolves specialists through the agent directory and invokes them.
pub struct AgentInvoker {
    runtime: Arc<dyn AgentRuntime>,
    directory: AgentDirectory,
}

impl AgentInvoker {
    pub fn new(runtime: Arc<dyn AgentRuntime>, directory: AgentDirectory) -> Self {
        Self { runtime, directory }
    }

    pub fn directory(&self) -> &AgentDirectory {
        &self.directory
    }

    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    fn agent(&self, specialist: Specialist) -> Result<&AgentReference, AgentError> {
        self.directory
            .specialist(specialist)
            .map_err(|e| AgentError::NotConfigured(e.to_string()))
    }

    /// Invoke one agent and return its full reply text.
    pub async fn invoke_text(
        &self,
        agent: &AgentReference,
        prompt: &str,
    ) -> Result<String, AgentError> {
        let session_id = new_session_id();
        let stream = self.runtime.invoke(agent, &session_id, prompt).await?;
        let text = collect_reply(stream).await?;
        debug!(agent_id = %agent.agent_id, session_id = %session_id, chars = text.len(), "Agent replied");
        Ok(text)
    }

    /// Invoke a specialist and return its free-text report.
    pub async fn ask(&self, specialist: Specialist, prompt: &str) -> Result<String, AgentError> {
        let agent = self.agent(specialist)?;
        info!(specialist = %specialist, "Invoking specialist");
        self.invoke_text(agent, prompt).await
    }

    /// Invoke a specialist and interpret the reply as a structured envelope.
    pub async fn ask_structured(
        &self,
        specialist: Specialist,
        prompt: &str,
    ) -> Result<AgentReply, AgentError> {
        let text = self.ask(specialist, prompt).await?;
        Ok(AgentReply::parse(&text))
    }
}
