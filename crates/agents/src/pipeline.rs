//! Comprehensive report generation.
//!
//! The three domain specialists each read the patient summary; the orchestrator
//! then reads their reports and writes the comprehensive analysis. The result
//! is cached in the caller's [`Session`] so later questions can reuse it.

use std::sync::Arc;

use cardiolake_core::agent::Specialist;
use cardiolake_core::error::AgentError;
use cardiolake_core::patient::PatientSummary;
use chrono::Utc;
use tracing::info;

use crate::cache::{CachedReportSet, Session};
use crate::invoke::AgentInvoker;
use crate::templates;

pub struct ReportPipeline {
    invoker: Arc<AgentInvoker>,
}

impl ReportPipeline {
    pub fn new(invoker: Arc<AgentInvoker>) -> Self {
        Self { invoker }
    }

    /// Run all four agents for `summary` and cache the result in `session`.
    ///
    /// Any agent failure aborts the run and leaves the session untouched.
    pub async fn generate(
        &self,
        session: &mut Session,
        summary: &PatientSummary,
    ) -> Result<CachedReportSet, AgentError> {
        info!(patient_id = %summary.id, session_id = %session.id(), "Generating comprehensive report");

        let cardiology_prompt = templates::cardiology_prompt(summary);
        let radiology_prompt = templates::radiology_prompt(summary);
        let endocrinology_prompt = templates::endocrinology_prompt(summary);

        let (cardiology, radiology, endocrinology) = tokio::try_join!(
            self.invoker
                .ask(Specialist::Cardiologist, &cardiology_prompt),
            self.invoker.ask(Specialist::Radiologist, &radiology_prompt),
            self.invoker
                .ask(Specialist::Endocrinologist, &endocrinology_prompt),
        )?;

        let orchestrator_prompt =
            templates::orchestrator_prompt(summary, &cardiology, &radiology, &endocrinology);
        let comprehensive = self
            .invoker
            .ask(Specialist::Orchestrator, &orchestrator_prompt)
            .await?;

        let reports = CachedReportSet {
            cardiology,
            radiology,
            endocrinology,
            comprehensive,
            patient_summary: summary.clone(),
            generated_at: Utc::now(),
        };
        session.cache_reports(reports.clone());
        info!(patient_id = %summary.id, "Comprehensive report cached");
        Ok(reports)
    }
}
