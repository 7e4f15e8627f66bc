//! FhirStore trait — the abstraction over the FHIR datastore.
//!
//! The HealthLake client in `cardiolake-fhir` implements this; tests use
//! in-memory stores. Callers never see transport details beyond
//! [`StoreError`].

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::fhir::{Bundle, ResourceType, SearchParams};

#[async_trait]
pub trait FhirStore: Send + Sync {
    /// A human-readable name for this store (e.g., "healthlake").
    fn name(&self) -> &str;

    /// Search one resource type. No matches is `Ok` with an empty bundle.
    async fn search(
        &self,
        resource_type: ResourceType,
        params: &SearchParams,
    ) -> Result<Bundle, StoreError>;

    /// Create a resource. The type is taken from its `resourceType` field.
    /// Returns the stored resource, including the server-assigned `id`.
    async fn create(&self, resource: &Value) -> Result<Value, StoreError>;
}

/// The server-assigned id of a created resource.
pub fn created_id(resource: &Value) -> Result<String, StoreError> {
    resource
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::InvalidResponse("created resource has no id".into()))
}
