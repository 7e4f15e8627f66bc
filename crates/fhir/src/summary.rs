//! Patient aggregation.
//!
//! A summary is six independent searches (demographics, conditions,
//! medications, allergies, ECG presence, diagnostic reports) issued together
//! and folded into one [`PatientSummary`]. A search that matches nothing
//! leaves its field at the sentinel; only store errors fail the call.

use std::sync::Arc;

use cardiolake_config::HealthLakeConfig;
use cardiolake_core::error::StoreError;
use cardiolake_core::fhir::{Bundle, ResourceType, SearchParams, concept_text, human_name};
use cardiolake_core::patient::{Measurement, PatientRecord, PatientSummary, UNKNOWN};
use cardiolake_core::store::FhirStore;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::observations::parse_measurements;

/// Device code searched for to decide `has_ecg`.
pub const ECG_CODE: &str = "131328";

/// What the store holds for one patient, for spot-checking a seed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientCheck {
    pub patient_id: String,
    /// `None` when no Patient resource has this id.
    pub name: Option<String>,
    pub conditions: Vec<String>,
    pub ecg_observations: usize,
    pub reports: Vec<String>,
    pub media: Vec<String>,
}

impl PatientCheck {
    pub fn found(&self) -> bool {
        self.name.is_some()
    }
}

pub struct SummaryService {
    store: Arc<dyn FhirStore>,
    patient_page_size: u32,
    category_count: u32,
}

impl SummaryService {
    pub fn new(store: Arc<dyn FhirStore>) -> Self {
        let defaults = HealthLakeConfig::default();
        Self::from_config(store, &defaults)
    }

    pub fn from_config(store: Arc<dyn FhirStore>, config: &HealthLakeConfig) -> Self {
        Self {
            store,
            patient_page_size: config.patient_page_size,
            category_count: config.category_count,
        }
    }

    pub fn store(&self) -> &Arc<dyn FhirStore> {
        &self.store
    }

    /// Up to `count` patients (the configured page size when `None`).
    pub async fn list_patients(&self, count: Option<u32>) -> Result<Vec<PatientRecord>, StoreError> {
        let params = SearchParams::new().count(count.unwrap_or(self.patient_page_size));
        let bundle = self.store.search(ResourceType::Patient, &params).await?;
        Ok(bundle.resources().filter_map(PatientRecord::from_resource).collect())
    }

    /// `None` when the store has no patient with this id.
    pub async fn get_patient(&self, id: &str) -> Result<Option<PatientRecord>, StoreError> {
        let bundle = self
            .store
            .search(ResourceType::Patient, &SearchParams::new().id(id))
            .await?;
        Ok(bundle.resources().find_map(PatientRecord::from_resource))
    }

    pub async fn summarize(&self, id: &str) -> Result<PatientSummary, StoreError> {
        let by_patient = || SearchParams::new().patient(id).count(self.category_count);

        let demographics = SearchParams::new().id(id);
        let conditions = by_patient();
        let medications = by_patient();
        let allergies = by_patient();
        let ecg = SearchParams::new().patient(id).code(ECG_CODE).count(1);
        let reports = by_patient();

        let (patient, conditions, medications, allergies, ecg, reports) = tokio::try_join!(
            self.store.search(ResourceType::Patient, &demographics),
            self.store.search(ResourceType::Condition, &conditions),
            self.store.search(ResourceType::MedicationRequest, &medications),
            self.store.search(ResourceType::AllergyIntolerance, &allergies),
            self.store.search(ResourceType::Observation, &ecg),
            self.store.search(ResourceType::DiagnosticReport, &reports),
        )?;

        let mut summary = PatientSummary::unknown(id);
        if let Some(resource) = patient.first() {
            summary.apply_demographics(resource);
        }
        summary.conditions = texts(&conditions, "code");
        summary.medications = texts(&medications, "medicationCodeableConcept");
        summary.allergies = texts(&allergies, "code");
        summary.has_ecg = !ecg.is_empty();
        summary.mri_reports_count = reports.len();

        debug!(
            patient = %id,
            conditions = summary.conditions.len(),
            medications = summary.medications.len(),
            allergies = summary.allergies.len(),
            has_ecg = summary.has_ecg,
            reports = summary.mri_reports_count,
            "Built patient summary"
        );
        Ok(summary)
    }

    /// Look up everything seeded for `id`: demographics, conditions, ECG
    /// observations, diagnostic reports and media titles.
    pub async fn verify(&self, id: &str) -> Result<PatientCheck, StoreError> {
        let by_patient = || SearchParams::new().patient(id).count(self.patient_page_size);
        let demographics = SearchParams::new().id(id);
        let conditions = by_patient();
        let ecg = by_patient().code(ECG_CODE);
        let reports = by_patient();
        let media = by_patient();

        let (patient, conditions, ecg, reports, media) = tokio::try_join!(
            self.store.search(ResourceType::Patient, &demographics),
            self.store.search(ResourceType::Condition, &conditions),
            self.store.search(ResourceType::Observation, &ecg),
            self.store.search(ResourceType::DiagnosticReport, &reports),
            self.store.search(ResourceType::Media, &media),
        )?;

        let unknown = || UNKNOWN.to_string();
        Ok(PatientCheck {
            patient_id: id.to_string(),
            name: patient
                .first()
                .map(|p| human_name(p).unwrap_or_else(unknown)),
            conditions: conditions
                .resources()
                .map(|r| concept_text(r, "code").map_or_else(unknown, str::to_string))
                .collect(),
            ecg_observations: ecg.len(),
            reports: reports
                .resources()
                .map(|r| concept_text(r, "code").map_or_else(unknown, str::to_string))
                .collect(),
            media: media
                .resources()
                .map(|r| {
                    r.pointer("/content/title")
                        .and_then(Value::as_str)
                        .map_or_else(unknown, str::to_string)
                })
                .collect(),
        })
    }

    /// Numeric observation values for charting.
    pub async fn measurements(&self, id: &str) -> Result<Vec<Measurement>, StoreError> {
        let params = SearchParams::new().patient(id).count(self.patient_page_size);
        let bundle = self.store.search(ResourceType::Observation, &params).await?;
        let observations: Vec<Value> = bundle.entry.into_iter().map(|e| e.resource).collect();
        Ok(parse_measurements(&observations))
    }
}

/// `<field>.text` of every entry that has one.
fn texts(bundle: &Bundle, field: &str) -> Vec<String> {
    bundle
        .resources()
        .filter_map(|r| concept_text(r, field))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use async_trait::async_trait;
    use cardiolake_core::store::created_id;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every search and answers from a fixed table.
    struct ScriptedStore {
        calls: Mutex<Vec<(ResourceType, Vec<(String, String)>)>>,
        fail_on: Option<ResourceType>,
    }

    impl ScriptedStore {
        fn new(fail_on: Option<ResourceType>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on,
            }
        }
    }

    #[async_trait]
    impl FhirStore for ScriptedStore {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn search(
            &self,
            resource_type: ResourceType,
            params: &SearchParams,
        ) -> Result<Bundle, StoreError> {
            self.calls.lock().unwrap().push((
                resource_type,
                params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ));
            if self.fail_on == Some(resource_type) {
                return Err(StoreError::AuthenticationFailed("expired token".into()));
            }
            Ok(match resource_type {
                ResourceType::Condition => Bundle::of(vec![
                    json!({"resourceType": "Condition", "code": {"text": "Atrial fibrillation"}}),
                    json!({"resourceType": "Condition", "code": {"coding": []}}),
                ]),
                _ => Bundle::default(),
            })
        }

        async fn create(&self, _resource: &Value) -> Result<Value, StoreError> {
            unreachable!("summary never writes")
        }
    }

    #[tokio::test]
    async fn unknown_patient_gets_sentinels() {
        let service = SummaryService::new(Arc::new(InMemoryStore::new()));
        let summary = service.summarize("nobody").await.unwrap();
        assert_eq!(summary, PatientSummary::unknown("nobody"));
    }

    #[tokio::test]
    async fn one_condition_and_nothing_else() {
        let store = Arc::new(ScriptedStore::new(None));
        let service = SummaryService::new(store.clone());
        let summary = service.summarize("p1").await.unwrap();

        assert_eq!(summary.name, UNKNOWN);
        assert_eq!(summary.conditions, vec!["Atrial fibrillation"]);
        assert!(summary.medications.is_empty());
        assert!(summary.allergies.is_empty());
        assert!(!summary.has_ecg);
        assert_eq!(summary.mri_reports_count, 0);
    }

    #[tokio::test]
    async fn lookups_use_documented_parameters() {
        let store = Arc::new(ScriptedStore::new(None));
        let service = SummaryService::new(store.clone());
        service.summarize("p1").await.unwrap();

        let calls = store.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 6);
        let params_for = |rt: ResourceType| {
            calls
                .iter()
                .find(|(t, _)| *t == rt)
                .map(|(_, p)| p.clone())
                .unwrap()
        };
        let pair = |k: &str, v: &str| (k.to_string(), v.to_string());

        assert_eq!(params_for(ResourceType::Patient), vec![pair("_id", "p1")]);
        assert_eq!(
            params_for(ResourceType::Condition),
            vec![pair("patient", "p1"), pair("_count", "10")]
        );
        assert_eq!(
            params_for(ResourceType::Observation),
            vec![pair("patient", "p1"), pair("code", ECG_CODE), pair("_count", "1")]
        );
    }

    #[tokio::test]
    async fn transport_failure_propagates() {
        let store = Arc::new(ScriptedStore::new(Some(ResourceType::MedicationRequest)));
        let service = SummaryService::new(store);
        assert!(matches!(
            service.summarize("p1").await,
            Err(StoreError::AuthenticationFailed(_))
        ));
    }

    #[tokio::test]
    async fn full_summary_from_store() {
        let store = Arc::new(InMemoryStore::new());
        let patient = store
            .create(&json!({
                "resourceType": "Patient",
                "name": [{"given": ["Maria", "Elena"], "family": "Garcia"}],
                "gender": "female",
                "birthDate": "1965-07-15"
            }))
            .await
            .unwrap();
        let id = created_id(&patient).unwrap();
        let subject = json!({"reference": format!("Patient/{id}")});

        for resource in [
            json!({"resourceType": "Condition", "subject": subject, "code": {"text": "Heart failure"}}),
            json!({"resourceType": "MedicationRequest", "subject": subject,
                   "medicationCodeableConcept": {"text": "Furosemide 40mg"}}),
            json!({"resourceType": "AllergyIntolerance", "patient": subject, "code": {"text": "Penicillin"}}),
            json!({"resourceType": "Observation", "subject": subject,
                   "code": {"coding": [{"code": ECG_CODE}]}}),
            json!({"resourceType": "DiagnosticReport", "subject": subject, "code": {"text": "Cardiac MRI"}}),
            json!({"resourceType": "DiagnosticReport", "subject": subject, "code": {"text": "ECG"}}),
        ] {
            store.create(&resource).await.unwrap();
        }

        let service = SummaryService::new(store);
        let summary = service.summarize(&id).await.unwrap();
        assert_eq!(summary.name, "Maria Elena Garcia");
        assert_eq!(summary.birth_date, "1965-07-15");
        assert_eq!(summary.conditions, vec!["Heart failure"]);
        assert_eq!(summary.medications, vec!["Furosemide 40mg"]);
        assert_eq!(summary.allergies, vec!["Penicillin"]);
        assert!(summary.has_ecg);
        assert_eq!(summary.mri_reports_count, 2);
    }

    #[tokio::test]
    async fn list_and_get_patients() {
        let store = Arc::new(InMemoryStore::new());
        let mut ids = Vec::new();
        for family in ["Chen", "Brown", "Davis"] {
            let created = store
                .create(&json!({"resourceType": "Patient", "name": [{"family": family}]}))
                .await
                .unwrap();
            ids.push(created_id(&created).unwrap());
        }
        let service = SummaryService::new(store);

        assert_eq!(service.list_patients(None).await.unwrap().len(), 3);
        assert_eq!(service.list_patients(Some(2)).await.unwrap().len(), 2);

        let brown = service.get_patient(&ids[1]).await.unwrap().unwrap();
        assert_eq!(brown.name, "Brown");
        assert_eq!(brown.gender, UNKNOWN);
        assert!(service.get_patient("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn measurements_come_from_patient_observations() {
        let store = Arc::new(InMemoryStore::new());
        store
            .create(&json!({
                "resourceType": "Observation",
                "subject": {"reference": "Patient/p9"},
                "effectiveDateTime": "2024-01-01T00:00:00Z",
                "code": {"coding": [{"display": "Heart rate"}]},
                "valueQuantity": {"value": 88, "unit": "beats/minute"}
            }))
            .await
            .unwrap();
        let service = SummaryService::new(store);
        let m = service.measurements("p9").await.unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].value, 88.0);
        assert!(service.measurements("p10").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn verify_lists_what_was_stored() {
        let store = Arc::new(InMemoryStore::new());
        let patient = store
            .create(&json!({"resourceType": "Patient",
                            "name": [{"given": ["Sarah"], "family": "Johnson"}]}))
            .await
            .unwrap();
        let id = created_id(&patient).unwrap();
        let subject = json!({"reference": format!("Patient/{id}")});
        for resource in [
            json!({"resourceType": "Condition", "subject": subject,
                   "code": {"text": "Atrial fibrillation"}}),
            json!({"resourceType": "Observation", "subject": subject,
                   "code": {"coding": [{"code": ECG_CODE}]}}),
            json!({"resourceType": "DiagnosticReport", "subject": subject,
                   "code": {"text": "Cardiac MRI"}}),
            json!({"resourceType": "Media", "subject": subject,
                   "content": {"title": "MRI slice 1"}}),
        ] {
            store.create(&resource).await.unwrap();
        }
        let service = SummaryService::new(store);

        let check = service.verify(&id).await.unwrap();
        assert_eq!(check.name.as_deref(), Some("Sarah Johnson"));
        assert_eq!(check.conditions, vec!["Atrial fibrillation"]);
        assert_eq!(check.ecg_observations, 1);
        assert_eq!(check.reports, vec!["Cardiac MRI"]);
        assert_eq!(check.media, vec!["MRI slice 1"]);

        let empty = service.verify("nobody").await.unwrap();
        assert!(!empty.found());
        assert!(empty.conditions.is_empty());
        assert_eq!(empty.ecg_observations, 0);
    }
}
