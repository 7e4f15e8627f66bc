//! Follow-up questions answered from the cached reports.

use std::sync::Arc;

use cardiolake_core::agent::Specialist;
use cardiolake_core::error::AgentError;
use tracing::{debug, info};

use crate::cache::Session;
use crate::envelope::AgentReply;
use crate::invoke::AgentInvoker;
use crate::templates;

pub struct QaProcessor {
    invoker: Arc<AgentInvoker>,
}

impl QaProcessor {
    pub fn new(invoker: Arc<AgentInvoker>) -> Self {
        Self { invoker }
    }

    /// Answer `question` against the session's cached reports.
    ///
    /// Without cached reports the "No Data" reply comes back and no agent is
    /// contacted; that reply is not recorded in the history.
    pub async fn answer(
        &self,
        session: &mut Session,
        question: &str,
    ) -> Result<AgentReply, AgentError> {
        let Some(context) = session.cached_context() else {
            debug!(session_id = %session.id(), "No cached reports, skipping Q&A agent");
            return Ok(AgentReply::no_data());
        };

        info!(session_id = %session.id(), "Answering question");
        let prompt = templates::question_prompt(&context, question);
        let reply = self.invoker.ask_structured(Specialist::Qa, &prompt).await?;
        session.record_exchange(question, reply.clone());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedRuntime, sample_reports};
    use cardiolake_config::AgentDirectory;

    fn processor(runtime: Arc<ScriptedRuntime>) -> QaProcessor {
        let directory =
            AgentDirectory::from_json(r#"{"qa_agent": {"agent_id": "QA", "alias_id": "PROD"}}"#)
                .unwrap();
        QaProcessor::new(Arc::new(AgentInvoker::new(runtime, directory)))
    }

    #[tokio::test]
    async fn no_reports_means_no_data_and_no_call() {
        let runtime = Arc::new(ScriptedRuntime::new(vec![]));
        let qa = processor(runtime.clone());
        let mut session = Session::new();

        let reply = qa.answer(&mut session, "What are my top 3 health risks?").await.unwrap();
        assert_eq!(reply, AgentReply::no_data());
        assert!(runtime.calls().is_empty());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn prompt_carries_context_and_question() {
        let runtime = Arc::new(ScriptedRuntime::new(vec![vec![
            r#"{"answer": "Arrhythmia first.", "ui_type": "risk_assessment", "data": {}}"#,
        ]]));
        let qa = processor(runtime.clone());
        let mut session = Session::new();
        session.cache_reports(sample_reports());

        let reply = qa.answer(&mut session, "What should I do first?").await.unwrap();
        assert_eq!(reply.answer(), "Arrhythmia first.");
        assert_eq!(reply.envelope().ui_type, "risk_assessment");

        let calls = runtime.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].agent.agent_id, "QA");
        assert!(calls[0].input_text.starts_with("PATIENT INFORMATION:\nName: Sarah Ann Johnson"));
        assert!(calls[0].input_text.contains("\n\nUSER QUESTION: What should I do first?\n\n"));
        assert!(calls[0]
            .input_text
            .ends_with("Respond in JSON format with: answer, ui_type, data, sources, confidence"));
    }

    #[tokio::test]
    async fn unstructured_reply_is_recorded_as_fallback() {
        let runtime = Arc::new(ScriptedRuntime::new(vec![vec!["See ", "your cardiologist."]]));
        let qa = processor(runtime);
        let mut session = Session::new();
        session.cache_reports(sample_reports());

        let reply = qa.answer(&mut session, "Any advice?").await.unwrap();
        assert!(reply.is_fallback());
        assert_eq!(reply.answer(), "See your cardiologist.");

        let history = session.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "Any advice?");
        assert_eq!(history[0].response, reply);
    }

    #[tokio::test]
    async fn agent_error_is_not_recorded() {
        let runtime = Arc::new(ScriptedRuntime::with_results(vec![Err(
            AgentError::AuthenticationFailed("expired token".into()),
        )]));
        let qa = processor(runtime);
        let mut session = Session::new();
        session.cache_reports(sample_reports());

        assert!(matches!(
            qa.answer(&mut session, "q").await,
            Err(AgentError::AuthenticationFailed(_))
        ));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn cleared_session_answers_no_data() {
        let runtime = Arc::new(ScriptedRuntime::new(vec![vec!["first answer"]]));
        let qa = processor(runtime.clone());
        let mut session = Session::new();
        session.cache_reports(sample_reports());
        qa.answer(&mut session, "q1").await.unwrap();

        session.clear();
        let reply = qa.answer(&mut session, "q2").await.unwrap();
        assert_eq!(reply, AgentReply::no_data());
        assert_eq!(runtime.calls().len(), 1);
    }
}
