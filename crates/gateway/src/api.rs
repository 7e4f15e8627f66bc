//! Patient and session routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{delete, get, post},
};
use cardiolake_agents::{
    AgentReply, CachedReportSet, QUICK_QUESTIONS, QaExchange, QaProcessor, QuickQuestion,
    ReportPipeline,
};
use cardiolake_core::patient::{Measurement, PatientRecord, PatientSummary};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::sessions::SessionHandle;
use crate::{ApiError, SharedState};

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/patients", get(list_patients_handler))
        .route("/api/patients/{id}", get(get_patient_handler))
        .route("/api/patients/{id}/summary", get(patient_summary_handler))
        .route("/api/patients/{id}/observations", get(observations_handler))
        .route("/api/sessions", post(create_session_handler))
        .route("/api/sessions/{sid}/report", post(generate_report_handler))
        .route("/api/sessions/{sid}/questions", post(ask_question_handler))
        .route("/api/sessions/{sid}/history", get(history_handler))
        .route("/api/sessions/{sid}/cache", delete(clear_cache_handler))
        .route("/api/questions", get(quick_questions_handler))
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PatientListQuery {
    count: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct CreateSessionResponse {
    session_id: String,
    created_at: String,
}

#[derive(Deserialize)]
struct ReportRequest {
    patient_id: String,
}

#[derive(Deserialize)]
struct QuestionRequest {
    question: String,
}

#[derive(Serialize)]
struct HistoryResponse {
    session_id: String,
    has_cached_reports: bool,
    history: Vec<QaExchange>,
}

// ── Patients ──────────────────────────────────────────────────────────────

async fn list_patients_handler(
    State(state): State<SharedState>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Vec<PatientRecord>>, ApiError> {
    Ok(Json(state.summary.list_patients(query.count).await?))
}

async fn get_patient_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<PatientRecord>, ApiError> {
    state
        .summary
        .get_patient(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))
}

async fn patient_summary_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<PatientSummary>, ApiError> {
    Ok(Json(state.summary.summarize(&id).await?))
}

async fn observations_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Measurement>>, ApiError> {
    Ok(Json(state.summary.measurements(&id).await?))
}

// ── Sessions ──────────────────────────────────────────────────────────────

async fn create_session_handler(
    State(state): State<SharedState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let (session_id, created_at) = state.sessions.create().await;
    info!(session_id = %session_id, "Session created");
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id,
            created_at: created_at.to_rfc3339(),
        }),
    )
}

async fn session_or_404(
    state: &SharedState,
    sid: &str,
) -> Result<SessionHandle, ApiError> {
    state
        .sessions
        .get(sid)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session '{sid}' not found")))
}

async fn generate_report_handler(
    State(state): State<SharedState>,
    Path(sid): Path<String>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Json<CachedReportSet>, ApiError> {
    let Json(payload) = payload?;
    if payload.patient_id.trim().is_empty() {
        return Err(ApiError::BadRequest("patient_id must not be empty".into()));
    }
    let session = session_or_404(&state, &sid).await?;
    let pipeline = ReportPipeline::new(state.agents()?.clone());

    let summary = state.summary.summarize(&payload.patient_id).await?;
    let mut session = session.lock().await;
    let reports = pipeline.generate(&mut session, &summary).await?;
    Ok(Json(reports))
}

async fn ask_question_handler(
    State(state): State<SharedState>,
    Path(sid): Path<String>,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<AgentReply>, ApiError> {
    let Json(payload) = payload?;
    if payload.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".into()));
    }
    let session = session_or_404(&state, &sid).await?;
    let qa = QaProcessor::new(state.agents()?.clone());

    let mut session = session.lock().await;
    let reply = qa.answer(&mut session, &payload.question).await?;
    Ok(Json(reply))
}

async fn history_handler(
    State(state): State<SharedState>,
    Path(sid): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session = session_or_404(&state, &sid).await?;
    let session = session.lock().await;
    Ok(Json(HistoryResponse {
        session_id: sid,
        has_cached_reports: session.has_cached_reports(),
        history: session.history().to_vec(),
    }))
}

async fn clear_cache_handler(
    State(state): State<SharedState>,
    Path(sid): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session = session_or_404(&state, &sid).await?;
    session.lock().await.clear();
    info!(session_id = %sid, "Session cache cleared");
    Ok(StatusCode::NO_CONTENT)
}

async fn quick_questions_handler() -> Json<&'static [QuickQuestion]> {
    Json(&QUICK_QUESTIONS)
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GatewayState, build_router};
    use axum::body::Body;
    use axum::http::Request;
    use cardiolake_agents::AgentInvoker;
    use cardiolake_config::AgentDirectory;
    use cardiolake_core::agent::{AgentReference, AgentRuntime, FragmentStream, ResponseFragment};
    use cardiolake_core::error::AgentError;
    use cardiolake_fhir::seed::cardiac_patients;
    use cardiolake_fhir::{InMemoryStore, Seeder, SummaryService};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    /// Replies in order, one whole string per invocation.
    struct ScriptedRuntime {
        replies: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedRuntime {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl AgentRuntime for ScriptedRuntime {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn invoke(
            &self,
            _agent: &AgentReference,
            _session_id: &str,
            input_text: &str,
        ) -> Result<FragmentStream, AgentError> {
            self.prompts.lock().unwrap().push(input_text.to_string());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("ScriptedRuntime: no more replies");
            let (tx, rx) = tokio::sync::mpsc::channel(2);
            tx.try_send(Ok(ResponseFragment::text(reply))).unwrap();
            tx.try_send(Ok(ResponseFragment::done())).unwrap();
            Ok(rx)
        }
    }

    fn directory() -> AgentDirectory {
        AgentDirectory::from_json(
            r#"{"cardiologist_agent": {"agent_id": "C", "alias_id": "A"},
                "radiologist_agent": {"agent_id": "R", "alias_id": "A"},
                "endocrinologist_agent": {"agent_id": "E", "alias_id": "A"},
                "orchestrator_agent": {"agent_id": "O", "alias_id": "A"},
                "qa_agent": {"agent_id": "Q", "alias_id": "A"}}"#,
        )
        .unwrap()
    }

    async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        let report = Seeder::new(Arc::new(store.clone()))
            .seed_cardiac(&cardiac_patients())
            .await;
        assert!(report.is_complete());
        store
    }

    async fn test_state(runtime: Option<Arc<ScriptedRuntime>>) -> SharedState {
        let store = Arc::new(seeded_store().await);
        let agents = runtime.map(|rt| Arc::new(AgentInvoker::new(rt, directory())));
        Arc::new(GatewayState::new(SummaryService::new(store), agents))
    }

    async fn call(state: &SharedState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = build_router(state.clone()).oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn first_patient_id(state: &SharedState) -> String {
        let (_, list) = call(state, "GET", "/api/patients", None).await;
        list[0]["id"].as_str().unwrap().to_string()
    }

    async fn new_session(state: &SharedState) -> String {
        let (status, body) = call(state, "POST", "/api/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn list_patients_returns_seeded_records() {
        let state = test_state(None).await;
        let (status, body) = call(&state, "GET", "/api/patients", None).await;
        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 5);
        assert!(list[0].get("birthDate").is_some());

        let (_, body) = call(&state, "GET", "/api/patients?count=2", None).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn get_patient_and_missing_patient() {
        let state = test_state(None).await;
        let id = first_patient_id(&state).await;

        let (status, body) = call(&state, "GET", &format!("/api/patients/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id.as_str());

        let (status, body) = call(&state, "GET", "/api/patients/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Patient not found");
    }

    #[tokio::test]
    async fn summary_for_seeded_and_unknown_patient() {
        let state = test_state(None).await;
        let id = first_patient_id(&state).await;

        let (status, body) = call(&state, "GET", &format!("/api/patients/{id}/summary"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["conditions"].as_array().unwrap().len(), 1);
        assert_eq!(body["has_ecg"], true);
        assert_eq!(body["mri_reports_count"], 1);

        let (status, body) = call(&state, "GET", "/api/patients/ghost/summary", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Unknown");
        assert_eq!(body["conditions"], json!([]));
        assert_eq!(body["has_ecg"], false);
    }

    #[tokio::test]
    async fn observations_are_flattened() {
        let state = test_state(None).await;
        let id = first_patient_id(&state).await;
        let (status, body) =
            call(&state, "GET", &format!("/api/patients/{id}/observations"), None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r["patient_id"] == id.as_str()));
    }

    #[tokio::test]
    async fn report_then_question_then_clear() {
        let runtime = Arc::new(ScriptedRuntime::new(&[
            "Cardiology report",
            "Radiology report",
            "Endocrinology report",
            "Comprehensive report",
            r#"{"answer": "Arrhythmia.", "ui_type": "risk_assessment", "data": {"risks": []}}"#,
        ]));
        let state = test_state(Some(runtime.clone())).await;
        let patient_id = first_patient_id(&state).await;
        let sid = new_session(&state).await;

        let (status, body) = call(
            &state,
            "POST",
            &format!("/api/sessions/{sid}/report"),
            Some(json!({"patient_id": patient_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["comprehensive"], "Comprehensive report");
        assert_eq!(body["patient_summary"]["id"], patient_id.as_str());

        let (status, body) = call(
            &state,
            "POST",
            &format!("/api/sessions/{sid}/questions"),
            Some(json!({"question": "What are my top 3 health risks?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "Arrhythmia.");
        assert_eq!(body["ui_type"], "risk_assessment");
        let qa_prompt = runtime.prompts.lock().unwrap()[4].clone();
        assert!(qa_prompt.contains("COMPREHENSIVE ANALYSIS:\nComprehensive report"));

        let (_, body) = call(&state, "GET", &format!("/api/sessions/{sid}/history"), None).await;
        assert_eq!(body["has_cached_reports"], true);
        assert_eq!(body["history"][0]["question"], "What are my top 3 health risks?");

        let (status, _) = call(&state, "DELETE", &format!("/api/sessions/{sid}/cache"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = call(&state, "GET", &format!("/api/sessions/{sid}/history"), None).await;
        assert_eq!(body["has_cached_reports"], false);
        assert_eq!(body["history"], json!([]));

        let (_, body) = call(
            &state,
            "POST",
            &format!("/api/sessions/{sid}/questions"),
            Some(json!({"question": "Anything else?"})),
        )
        .await;
        assert_eq!(body["data"]["title"], "No Data");
        assert_eq!(runtime.prompts.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn question_without_report_is_no_data() {
        let runtime = Arc::new(ScriptedRuntime::new(&[]));
        let state = test_state(Some(runtime.clone())).await;
        let sid = new_session(&state).await;

        let (status, body) = call(
            &state,
            "POST",
            &format!("/api/sessions/{sid}/questions"),
            Some(json!({"question": "What should I do first?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ui_type"], "detailed_card");
        assert_eq!(body["data"]["title"], "No Data");
        assert!(runtime.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn agent_routes_without_runtime_are_unavailable() {
        let state = test_state(None).await;
        let sid = new_session(&state).await;
        let (status, body) = call(
            &state,
            "POST",
            &format!("/api/sessions/{sid}/report"),
            Some(json!({"patient_id": "p1"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["detail"].as_str().unwrap().contains("no agent runtime"));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let state = test_state(None).await;
        let (status, body) = call(&state, "GET", "/api/sessions/missing/history", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Session 'missing' not found");

        let (status, _) = call(&state, "DELETE", "/api/sessions/missing/cache", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn empty_question_is_rejected() {
        let state = test_state(None).await;
        let sid = new_session(&state).await;
        let (status, _) = call(
            &state,
            "POST",
            &format!("/api/sessions/{sid}/questions"),
            Some(json!({"question": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_or_missing_body_is_a_bad_request() {
        let state = test_state(None).await;
        let sid = new_session(&state).await;

        let req = Request::builder()
            .method("POST")
            .uri(format!("/api/sessions/{sid}/questions"))
            .header("content-type", "application/json")
            .body(Body::from("{\"question\": "))
            .unwrap();
        let response = build_router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(!body["detail"].as_str().unwrap().is_empty());

        let (status, body) = call(&state, "POST", &format!("/api/sessions/{sid}/report"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());

        let (status, body) = call(
            &state,
            "POST",
            &format!("/api/sessions/{sid}/report"),
            Some(json!({"patient": "p1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("patient_id"));
    }

    #[tokio::test]
    async fn structured_answer_is_passed_through_as_sent() {
        let answer = json!({"answer": "Low risk.", "confidence": 0.9, "sources": []});
        let runtime = Arc::new(ScriptedRuntime::new(&[
            "c",
            "r",
            "e",
            "comprehensive",
            &answer.to_string(),
        ]));
        let state = test_state(Some(runtime)).await;
        let patient_id = first_patient_id(&state).await;
        let sid = new_session(&state).await;
        call(
            &state,
            "POST",
            &format!("/api/sessions/{sid}/report"),
            Some(json!({"patient_id": patient_id})),
        )
        .await;

        let (status, body) = call(
            &state,
            "POST",
            &format!("/api/sessions/{sid}/questions"),
            Some(json!({"question": "How am I doing?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, answer);
    }

    #[tokio::test]
    async fn quick_questions_listed() {
        let state = test_state(None).await;
        let (status, body) = call(&state, "GET", "/api/questions", None).await;
        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().unwrap();
        assert_eq!(list.len(), 6);
        assert_eq!(list[0]["label"], "🎯 Top Risks");
        assert_eq!(list[0]["prompt"], "What are my top 3 health risks?");
    }
}
