//! FHIR R4 plumbing shared by the store client and its callers.
//!
//! Resources are kept as `serde_json::Value`: the datastore is the authority on
//! their shape and we only ever read a handful of fields out of them. The
//! accessors here encode which fields those are.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The resource types this workspace reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Patient,
    Condition,
    Observation,
    DiagnosticReport,
    Media,
    MedicationRequest,
    AllergyIntolerance,
}

impl ResourceType {
    /// The path segment / `resourceType` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "Patient",
            Self::Condition => "Condition",
            Self::Observation => "Observation",
            Self::DiagnosticReport => "DiagnosticReport",
            Self::Media => "Media",
            Self::MedicationRequest => "MedicationRequest",
            Self::AllergyIntolerance => "AllergyIntolerance",
        }
    }

    /// Parse a `resourceType` value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Patient" => Some(Self::Patient),
            "Condition" => Some(Self::Condition),
            "Observation" => Some(Self::Observation),
            "DiagnosticReport" => Some(Self::DiagnosticReport),
            "Media" => Some(Self::Media),
            "MedicationRequest" => Some(Self::MedicationRequest),
            "AllergyIntolerance" => Some(Self::AllergyIntolerance),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered search parameters for a FHIR search request.
///
/// Order is preserved for logging; the signer canonicalizes separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    params: Vec<(String, String)>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// `patient=<id>`
    pub fn patient(self, patient_id: &str) -> Self {
        self.with("patient", patient_id)
    }

    /// `_id=<id>`
    pub fn id(self, id: &str) -> Self {
        self.with("_id", id)
    }

    /// `code=<code>`
    pub fn code(self, code: &str) -> Self {
        self.with("code", code)
    }

    /// `_count=<n>`
    pub fn count(self, count: u32) -> Self {
        self.with("_count", count.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Look up the first value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A FHIR search result.
///
/// Everything is optional: the store omits `entry` entirely when nothing
/// matched, and that must decode to an empty bundle rather than an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(rename = "resourceType", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleEntry {
    #[serde(rename = "fullUrl", default, skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    #[serde(default)]
    pub resource: Value,
}

impl Bundle {
    /// A bundle with the given resources as entries.
    pub fn of(resources: Vec<Value>) -> Self {
        Self {
            resource_type: Some("Bundle".into()),
            total: Some(resources.len() as u64),
            entry: resources
                .into_iter()
                .map(|resource| BundleEntry {
                    full_url: None,
                    resource,
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entry.len()
    }

    pub fn resources(&self) -> impl Iterator<Item = &Value> {
        self.entry.iter().map(|e| &e.resource)
    }

    pub fn first(&self) -> Option<&Value> {
        self.entry.first().map(|e| &e.resource)
    }
}

/// `<field>.text` of a CodeableConcept, if present and a string.
pub fn concept_text<'a>(resource: &'a Value, field: &str) -> Option<&'a str> {
    resource.get(field)?.get("text")?.as_str()
}

/// Display name from the first `HumanName`: given parts joined by spaces,
/// then family, trimmed. `None` when that comes out empty.
pub fn human_name(resource: &Value) -> Option<String> {
    let name = resource.get("name")?.as_array()?.first()?;
    let given = name
        .get("given")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    let family = name.get("family").and_then(Value::as_str).unwrap_or("");
    let full = format!("{given} {family}").trim().to_string();
    if full.is_empty() { None } else { Some(full) }
}

/// The id part of a `Type/id` reference.
pub fn reference_id(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_entry_decodes_as_empty_bundle() {
        let bundle: Bundle =
            serde_json::from_value(json!({"resourceType": "Bundle", "type": "searchset", "total": 0}))
                .unwrap();
        assert!(bundle.is_empty());
        assert!(bundle.first().is_none());
    }

    #[test]
    fn search_params_keep_insertion_order() {
        let params = SearchParams::new().patient("p1").code("131328").count(1);
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("patient", "p1"), ("code", "131328"), ("_count", "1")]);
        assert_eq!(params.get("_count"), Some("1"));
    }

    #[test]
    fn human_name_joins_given_and_family() {
        let patient = json!({
            "name": [{"use": "official", "family": "Johnson", "given": ["Sarah", "Ann"]}]
        });
        assert_eq!(human_name(&patient).as_deref(), Some("Sarah Ann Johnson"));
    }

    #[test]
    fn human_name_absent_or_blank() {
        assert_eq!(human_name(&json!({})), None);
        assert_eq!(human_name(&json!({"name": []})), None);
        assert_eq!(human_name(&json!({"name": [{"given": []}]})), None);
        assert_eq!(
            human_name(&json!({"name": [{"family": "Chen"}]})).as_deref(),
            Some("Chen")
        );
    }

    #[test]
    fn concept_text_requires_text_field() {
        let condition = json!({"code": {"text": "Heart failure", "coding": []}});
        assert_eq!(concept_text(&condition, "code"), Some("Heart failure"));
        assert_eq!(concept_text(&json!({"code": {"coding": []}}), "code"), None);
    }

    #[test]
    fn resource_type_parses_its_own_name() {
        for rt in [
            ResourceType::Patient,
            ResourceType::Condition,
            ResourceType::Observation,
            ResourceType::DiagnosticReport,
            ResourceType::Media,
            ResourceType::MedicationRequest,
            ResourceType::AllergyIntolerance,
        ] {
            assert_eq!(ResourceType::parse(rt.as_str()), Some(rt));
        }
        assert_eq!(ResourceType::parse("Encounter"), None);
    }

    #[test]
    fn reference_id_strips_type() {
        assert_eq!(reference_id("Patient/abc-123"), "abc-123");
        assert_eq!(reference_id("abc-123"), "abc-123");
    }
}
