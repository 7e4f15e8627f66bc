//! Flattened patient views returned by the API.
//!
//! Field names on the wire match the existing HTTP API (`birthDate`,
//! `has_ecg`, `mri_reports_count`), so clients built against it keep working.

use serde::{Deserialize, Serialize};

/// Sentinel for demographics the store did not provide.
pub const UNKNOWN: &str = "Unknown";

/// One row of the patient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: String,
    pub name: String,
    pub gender: String,
    #[serde(rename = "birthDate")]
    pub birth_date: String,
}

impl PatientRecord {
    /// Build from a Patient resource. Returns `None` if the resource has no id.
    pub fn from_resource(resource: &serde_json::Value) -> Option<Self> {
        let id = resource.get("id")?.as_str()?.to_string();
        Some(Self {
            id,
            name: crate::fhir::human_name(resource).unwrap_or_else(|| UNKNOWN.into()),
            gender: string_or_unknown(resource, "gender"),
            birth_date: string_or_unknown(resource, "birthDate"),
        })
    }
}

/// Everything the specialists need to know about a patient, in one record.
///
/// Absence is a valid state: every field has a sentinel (`"Unknown"`, empty
/// list, `false`, `0`) and a summary is returned even when the store knows
/// nothing about the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: String,
    pub name: String,
    pub gender: String,
    #[serde(rename = "birthDate")]
    pub birth_date: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub has_ecg: bool,
    #[serde(default)]
    pub mri_reports_count: usize,
}

impl PatientSummary {
    /// A summary with every field at its sentinel value.
    pub fn unknown(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: UNKNOWN.into(),
            gender: UNKNOWN.into(),
            birth_date: UNKNOWN.into(),
            conditions: Vec::new(),
            medications: Vec::new(),
            allergies: Vec::new(),
            has_ecg: false,
            mri_reports_count: 0,
        }
    }

    /// Copy demographics from a Patient resource, keeping sentinels for
    /// anything it lacks.
    pub fn apply_demographics(&mut self, patient: &serde_json::Value) {
        if let Some(name) = crate::fhir::human_name(patient) {
            self.name = name;
        }
        self.gender = string_or_unknown(patient, "gender");
        self.birth_date = string_or_unknown(patient, "birthDate");
    }
}

/// A single numeric observation value, flattened for charting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub patient_id: String,
    pub measurement: String,
    pub value: f64,
    pub unit: String,
    pub date: String,
}

fn string_or_unknown(resource: &serde_json::Value, field: &str) -> String {
    resource
        .get(field)
        .and_then(|v| v.as_str())
        .unwrap_or(UNKNOWN)
        .to_string()
}
