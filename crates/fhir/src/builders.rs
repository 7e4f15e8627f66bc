//! Resource builders.
//!
//! Pure functions from plain input fields to FHIR R4 JSON. Nothing here does
//! I/O or reads the clock: timestamps are passed in so the output is
//! reproducible.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

pub const LOINC: &str = "http://loinc.org";
pub const SNOMED: &str = "http://snomed.info/sct";
pub const UCUM: &str = "http://unitsofmeasure.org";
/// ISO/IEEE 11073 MDC nomenclature.
pub const MDC: &str = "urn:oid:2.16.840.1.113883.6.24";

/// LOINC "EKG study".
pub const LOINC_EKG_STUDY: &str = "11524-6";
/// LOINC "MRI Study".
pub const LOINC_MRI_STUDY: &str = "24627-2";
/// MDC ECG electrical potential; the summary's ECG lookup searches on it.
pub const MDC_ECG_CODE: &str = "131328";

const CONDITION_CLINICAL: &str = "http://terminology.hl7.org/CodeSystem/condition-clinical";
const CONDITION_VER_STATUS: &str = "http://terminology.hl7.org/CodeSystem/condition-ver-status";
const OBSERVATION_CATEGORY: &str = "http://terminology.hl7.org/CodeSystem/observation-category";
const OBSERVATION_INTERPRETATION: &str =
    "http://terminology.hl7.org/CodeSystem/v3-ObservationInterpretation";
const DIAGNOSTIC_SERVICE_SECTION: &str = "http://terminology.hl7.org/CodeSystem/v2-0074";
const MEDIA_TYPE: &str = "http://terminology.hl7.org/CodeSystem/media-type";

/// FHIR `dateTime` at second precision in UTC.
pub fn fhir_datetime(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Who a clinical resource is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub patient_id: String,
    pub display: Option<String>,
}

impl Subject {
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            display: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    fn to_reference(&self) -> Value {
        let mut reference = json!({ "reference": format!("Patient/{}", self.patient_id) });
        if let Some(display) = &self.display {
            reference["display"] = json!(display);
        }
        reference
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub line: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientInput {
    pub given: Vec<String>,
    pub family: String,
    pub gender: String,
    pub birth_date: String,
    pub address: Option<Address>,
}

impl PatientInput {
    /// "First Family", as used for `display` on references.
    pub fn display_name(&self) -> String {
        match self.given.first() {
            Some(first) => format!("{first} {}", self.family),
            None => self.family.clone(),
        }
    }
}

pub fn patient(input: &PatientInput) -> Value {
    let mut resource = json!({
        "resourceType": "Patient",
        "name": [{
            "use": "official",
            "family": input.family,
            "given": input.given,
        }],
        "gender": input.gender,
        "birthDate": input.birth_date,
    });
    if let Some(address) = &input.address {
        resource["address"] = json!([{
            "line": [address.line],
            "city": address.city,
            "state": address.state,
            "postalCode": address.postal_code,
            "country": address.country,
        }]);
    }
    resource
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionInput {
    pub text: String,
    /// SNOMED CT code; without it only `code.text` is set.
    pub snomed_code: Option<String>,
    pub onset: Option<DateTime<Utc>>,
}

/// An active, confirmed Condition.
pub fn condition(subject: &Subject, input: &ConditionInput, recorded: DateTime<Utc>) -> Value {
    let mut code = json!({ "text": input.text });
    if let Some(snomed) = &input.snomed_code {
        code["coding"] = json!([{
            "system": SNOMED,
            "code": snomed,
            "display": input.text,
        }]);
    }

    let mut resource = json!({
        "resourceType": "Condition",
        "clinicalStatus": {
            "coding": [{ "system": CONDITION_CLINICAL, "code": "active" }]
        },
        "verificationStatus": {
            "coding": [{ "system": CONDITION_VER_STATUS, "code": "confirmed" }]
        },
        "code": code,
        "subject": subject.to_reference(),
        "recordedDate": fhir_datetime(recorded),
    });
    if let Some(onset) = input.onset {
        resource["onsetDateTime"] = json!(fhir_datetime(onset));
    }
    resource
}

/// Interpretation flag on an ECG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpretation {
    Normal,
    Abnormal,
}

impl Interpretation {
    fn coding(&self) -> Value {
        let (code, display) = match self {
            Self::Normal => ("N", "Normal"),
            Self::Abnormal => ("A", "Abnormal"),
        };
        json!({ "system": OBSERVATION_INTERPRETATION, "code": code, "display": display })
    }
}

/// 12-lead ECG measurements. A PR interval of 0 means "not measurable" (as in
/// atrial fibrillation) and is left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcgInput {
    pub heart_rate: u32,
    pub pr_interval_ms: u32,
    pub qrs_duration_ms: u32,
    pub qt_interval_ms: u32,
    pub finding: String,
    pub interpretation: Option<Interpretation>,
}

fn quantity_component(loinc: &str, display: &str, value: u32, unit: &str, ucum: &str) -> Value {
    json!({
        "code": { "coding": [{ "system": LOINC, "code": loinc, "display": display }] },
        "valueQuantity": { "value": value, "unit": unit, "system": UCUM, "code": ucum }
    })
}

pub fn ecg_observation(subject: &Subject, input: &EcgInput, at: DateTime<Utc>) -> Value {
    let mut components = vec![quantity_component(
        "8867-4",
        "Heart rate",
        input.heart_rate,
        "beats/minute",
        "/min",
    )];
    if input.pr_interval_ms > 0 {
        components.push(quantity_component(
            "8625-6",
            "PR interval",
            input.pr_interval_ms,
            "ms",
            "ms",
        ));
    }
    components.push(quantity_component(
        "8633-0",
        "QRS duration",
        input.qrs_duration_ms,
        "ms",
        "ms",
    ));
    components.push(quantity_component(
        "8634-8",
        "QT interval",
        input.qt_interval_ms,
        "ms",
        "ms",
    ));

    let timestamp = fhir_datetime(at);
    let mut resource = json!({
        "resourceType": "Observation",
        "status": "final",
        "category": [{
            "coding": [{
                "system": OBSERVATION_CATEGORY,
                "code": "procedure",
                "display": "Procedure"
            }]
        }],
        "code": {
            "coding": [
                { "system": LOINC, "code": LOINC_EKG_STUDY, "display": "EKG study" },
                { "system": MDC, "code": MDC_ECG_CODE, "display": "MDC_ECG_ELEC_POTL" }
            ],
            "text": "12-Lead ECG"
        },
        "subject": subject.to_reference(),
        "effectiveDateTime": timestamp,
        "issued": timestamp,
        "valueString": input.finding,
        "component": components,
    });
    if let Some(interpretation) = input.interpretation {
        resource["interpretation"] = json!([{ "coding": [interpretation.coding()] }]);
    }
    resource
}

/// Cardiology DiagnosticReport pointing at an ECG Observation.
pub fn ecg_report(
    subject: &Subject,
    observation_id: &str,
    conclusion: &str,
    at: DateTime<Utc>,
) -> Value {
    let timestamp = fhir_datetime(at);
    json!({
        "resourceType": "DiagnosticReport",
        "status": "final",
        "category": [{
            "coding": [{
                "system": DIAGNOSTIC_SERVICE_SECTION,
                "code": "CG",
                "display": "Cardiology"
            }]
        }],
        "code": {
            "coding": [{ "system": LOINC, "code": LOINC_EKG_STUDY, "display": "EKG study" }],
            "text": "12-Lead Electrocardiogram"
        },
        "subject": subject.to_reference(),
        "effectiveDateTime": timestamp,
        "issued": timestamp,
        "result": [{ "reference": format!("Observation/{observation_id}") }],
        "conclusion": conclusion,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MriReportInput {
    /// Study name, e.g. "Brain MRI with DWI".
    pub study: String,
    pub findings: String,
    /// Also attach the findings as a plain-text `presentedForm`.
    pub attach_findings: bool,
}

pub fn mri_report(subject: &Subject, input: &MriReportInput, at: DateTime<Utc>) -> Value {
    let timestamp = fhir_datetime(at);
    let mut resource = json!({
        "resourceType": "DiagnosticReport",
        "status": "final",
        "code": {
            "coding": [{ "system": LOINC, "code": LOINC_MRI_STUDY, "display": "MRI Study" }],
            "text": input.study
        },
        "subject": subject.to_reference(),
        "effectiveDateTime": timestamp,
        "issued": timestamp,
        "conclusion": input.findings,
    });
    if input.attach_findings {
        resource["presentedForm"] = json!([{
            "contentType": "text/plain",
            "data": base64::engine::general_purpose::STANDARD.encode(input.findings.as_bytes()),
            "title": format!("{} Report", input.study)
        }]);
    }
    resource
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInput {
    pub content_type: String,
    pub data: Vec<u8>,
    pub title: String,
}

/// Image Media with the bytes embedded as base64.
pub fn media(subject: &Subject, input: &MediaInput, at: DateTime<Utc>) -> Value {
    json!({
        "resourceType": "Media",
        "status": "completed",
        "type": {
            "coding": [{ "system": MEDIA_TYPE, "code": "image", "display": "Image" }]
        },
        "subject": subject.to_reference(),
        "createdDateTime": fhir_datetime(at),
        "content": {
            "contentType": input.content_type,
            "data": base64::engine::general_purpose::STANDARD.encode(&input.data),
            "title": input.title
        }
    })
}
