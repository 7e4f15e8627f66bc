//! In-memory FHIR store, for demo mode and tests.
//!
//! Understands the handful of search parameters the workspace issues:
//! `_id`, `patient`, `code` (comma-separated, matched against any coding) and
//! `_count`. Other parameters are ignored.

use std::sync::Arc;

use async_trait::async_trait;
use cardiolake_core::error::StoreError;
use cardiolake_core::fhir::{Bundle, ResourceType, SearchParams};
use cardiolake_core::store::FhirStore;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone)]
pub struct InMemoryStore {
    resources: Arc<RwLock<Vec<Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            resources: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.resources.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.resources.read().await.is_empty()
    }

    /// Number of stored resources of one type.
    pub async fn count(&self, resource_type: ResourceType) -> usize {
        self.resources
            .read()
            .await
            .iter()
            .filter(|r| is_type(r, resource_type))
            .count()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FhirStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn search(
        &self,
        resource_type: ResourceType,
        params: &SearchParams,
    ) -> Result<Bundle, StoreError> {
        let limit = match params.get("_count") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| StoreError::ApiError {
                    status_code: 400,
                    message: format!("invalid _count: {raw}"),
                })?,
            None => usize::MAX,
        };

        let resources = self.resources.read().await;
        let matches: Vec<Value> = resources
            .iter()
            .filter(|r| is_type(r, resource_type))
            .filter(|r| matches_params(r, params))
            .take(limit)
            .cloned()
            .collect();
        Ok(Bundle::of(matches))
    }

    async fn create(&self, resource: &Value) -> Result<Value, StoreError> {
        let Some(resource_type) = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .and_then(ResourceType::parse)
        else {
            return Err(StoreError::ApiError {
                status_code: 400,
                message: "unsupported or missing resourceType".into(),
            });
        };

        let mut stored = resource.clone();
        stored["id"] = Value::String(Uuid::new_v4().to_string());
        tracing::trace!(resource = %resource_type, "Stored resource in memory");
        self.resources.write().await.push(stored.clone());
        Ok(stored)
    }
}

fn is_type(resource: &Value, resource_type: ResourceType) -> bool {
    resource.get("resourceType").and_then(Value::as_str) == Some(resource_type.as_str())
}

fn matches_params(resource: &Value, params: &SearchParams) -> bool {
    params.iter().all(|(key, value)| match key {
        "_id" => resource.get("id").and_then(Value::as_str) == Some(value),
        "patient" => refers_to_patient(resource, value),
        "code" => has_code(resource, value),
        _ => true,
    })
}

fn refers_to_patient(resource: &Value, patient_id: &str) -> bool {
    let wanted = format!("Patient/{patient_id}");
    ["/subject/reference", "/patient/reference"]
        .iter()
        .filter_map(|p| resource.pointer(p).and_then(Value::as_str))
        .any(|r| r == wanted || r == patient_id)
}

fn has_code(resource: &Value, codes: &str) -> bool {
    let Some(codings) = resource.pointer("/code/coding").and_then(Value::as_array) else {
        return false;
    };
    codes.split(',').any(|wanted| {
        // `system|code` or bare `code`
        let (system, code) = match wanted.split_once('|') {
            Some((s, c)) => (Some(s), c),
            None => (None, wanted),
        };
        codings.iter().any(|coding| {
            coding.get("code").and_then(Value::as_str) == Some(code)
                && system.is_none_or(|s| coding.get("system").and_then(Value::as_str) == Some(s))
        })
    })
}
