//! Shared test helpers.

use std::collections::VecDeque;
use std::sync::Mutex;

use cardiolake_core::agent::{AgentReference, AgentRuntime, FragmentStream, ResponseFragment};
use cardiolake_core::error::AgentError;
use cardiolake_core::patient::PatientSummary;
use chrono::Utc;

use crate::cache::CachedReportSet;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub agent: AgentReference,
    pub session_id: String,
    pub input_text: String,
}

/// An agent runtime that answers with scripted replies, in sequence.
///
/// Each reply is streamed as the given fragments followed by `done`.
/// Panics if more calls are made than replies provided.
pub struct ScriptedRuntime {
    replies: Mutex<VecDeque<Result<Vec<String>, AgentError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRuntime {
    pub fn new(replies: Vec<Vec<&str>>) -> Self {
        Self::with_results(
            replies
                .into_iter()
                .map(|r| Ok(r.into_iter().map(String::from).collect()))
                .collect(),
        )
    }

    pub fn with_results(replies: Vec<Result<Vec<String>, AgentError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AgentRuntime for ScriptedRuntime {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(
        &self,
        agent: &AgentReference,
        session_id: &str,
        input_text: &str,
    ) -> Result<FragmentStream, AgentError> {
        self.calls.lock().unwrap().push(RecordedCall {
            agent: agent.clone(),
            session_id: session_id.to_string(),
            input_text: input_text.to_string(),
        });
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedRuntime: no more replies for {}", agent.agent_id))?;

        let (tx, rx) = tokio::sync::mpsc::channel(reply.len() + 1);
        for fragment in reply {
            let _ = tx.try_send(Ok(ResponseFragment::text(fragment)));
        }
        let _ = tx.try_send(Ok(ResponseFragment::done()));
        Ok(rx)
    }
}

/// A filled-in report set for Sarah Johnson.
pub fn sample_reports() -> CachedReportSet {
    let mut summary = PatientSummary::unknown("p1");
    summary.name = "Sarah Ann Johnson".into();
    summary.gender = "female".into();
    summary.birth_date = "1958-03-22".into();
    CachedReportSet {
        cardiology: "AFib with RVR.".into(),
        radiology: "Enlarged left atrium.".into(),
        endocrinology: "Normal metabolic panel.".into(),
        comprehensive: "Moderate overall risk.".into(),
        patient_summary: summary,
        generated_at: Utc::now(),
    }
}
