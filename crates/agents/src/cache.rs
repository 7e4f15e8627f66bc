//! Per-session report cache and Q&A history.
//!
//! A [`Session`] is owned by whoever serves the user (the gateway keeps one
//! per session id, the CLI one per run) and passed explicitly to the report
//! pipeline and the Q&A processor. Nothing expires: the cache lives exactly as
//! long as the session does.

use cardiolake_core::agent::Specialist;
use cardiolake_core::patient::PatientSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::envelope::AgentReply;
use crate::invoke::new_session_id;

/// The four specialist reports from one pipeline run, plus the summary they
/// were generated from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedReportSet {
    pub cardiology: String,
    pub radiology: String,
    pub endocrinology: String,
    pub comprehensive: String,
    pub patient_summary: PatientSummary,
    pub generated_at: DateTime<Utc>,
}

impl CachedReportSet {
    pub fn report(&self, specialist: Specialist) -> Option<&str> {
        match specialist {
            Specialist::Cardiologist => Some(&self.cardiology),
            Specialist::Radiologist => Some(&self.radiology),
            Specialist::Endocrinologist => Some(&self.endocrinology),
            Specialist::Orchestrator => Some(&self.comprehensive),
            Specialist::Qa => None,
        }
    }

    /// The reports formatted as prompt context.
    pub fn context(&self) -> String {
        let s = &self.patient_summary;
        format!(
            "PATIENT INFORMATION:\n\
             Name: {}\n\
             Gender: {}\n\
             Birth Date: {}\n\
             \n\
             CARDIOLOGY REPORT:\n{}\n\
             \n\
             RADIOLOGY REPORT:\n{}\n\
             \n\
             ENDOCRINOLOGY REPORT:\n{}\n\
             \n\
             COMPREHENSIVE ANALYSIS:\n{}\n",
            s.name,
            s.gender,
            s.birth_date,
            self.cardiology,
            self.radiology,
            self.endocrinology,
            self.comprehensive
        )
    }
}

/// One question and the reply it got.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QaExchange {
    pub question: String,
    pub response: AgentReply,
    pub asked_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    reports: Option<CachedReportSet>,
    history: Vec<QaExchange>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(new_session_id())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            reports: None,
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replace whatever was cached before.
    pub fn cache_reports(&mut self, reports: CachedReportSet) {
        self.reports = Some(reports);
    }

    pub fn reports(&self) -> Option<&CachedReportSet> {
        self.reports.as_ref()
    }

    pub fn has_cached_reports(&self) -> bool {
        self.reports.is_some()
    }

    /// Prompt context built from the cached reports, if any.
    pub fn cached_context(&self) -> Option<String> {
        self.reports.as_ref().map(CachedReportSet::context)
    }

    pub fn record_exchange(&mut self, question: impl Into<String>, response: AgentReply) {
        self.history.push(QaExchange {
            question: question.into(),
            response,
            asked_at: Utc::now(),
        });
    }

    pub fn history(&self) -> &[QaExchange] {
        &self.history
    }

    /// Drop the cached reports and the Q&A history.
    pub fn clear(&mut self) {
        self.reports = None;
        self.history.clear();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_reports;

    #[test]
    fn new_session_has_no_context() {
        let session = Session::new();
        assert!(!session.has_cached_reports());
        assert!(session.cached_context().is_none());
        assert!(session.history().is_empty());
        assert!(!session.id().is_empty());
    }

    #[test]
    fn context_lists_sections_in_order() {
        let mut session = Session::with_id("s1");
        session.cache_reports(sample_reports());
        let context = session.cached_context().unwrap();

        assert!(context.starts_with("PATIENT INFORMATION:\nName: Sarah Ann Johnson\n"));
        assert!(context.contains("Gender: female\nBirth Date: 1958-03-22\n"));
        let order: Vec<usize> = [
            "CARDIOLOGY REPORT:\nAFib with RVR.",
            "RADIOLOGY REPORT:\nEnlarged left atrium.",
            "ENDOCRINOLOGY REPORT:\nNormal metabolic panel.",
            "COMPREHENSIVE ANALYSIS:\nModerate overall risk.",
        ]
        .iter()
        .map(|section| context.find(section).unwrap())
        .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn clear_removes_reports_and_history() {
        let mut session = Session::new();
        session.cache_reports(sample_reports());
        session.record_exchange("What now?", AgentReply::parse("Rest."));
        assert_eq!(session.history().len(), 1);

        session.clear();
        assert!(!session.has_cached_reports());
        assert!(session.cached_context().is_none());
        assert!(session.history().is_empty());
    }

    #[test]
    fn report_lookup_by_specialist() {
        let reports = sample_reports();
        assert_eq!(reports.report(Specialist::Orchestrator), Some("Moderate overall risk."));
        assert_eq!(reports.report(Specialist::Qa), None);
    }

    #[test]
    fn exchange_serializes_envelope() {
        let mut session = Session::new();
        session.record_exchange("q", AgentReply::parse("plain answer"));
        let json = serde_json::to_value(&session.history()[0]).unwrap();
        assert_eq!(json["question"], "q");
        assert_eq!(json["response"]["data"]["title"], "Response");
    }
}
