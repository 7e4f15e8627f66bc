//! Synthetic demo data.
//!
//! Two datasets: cardiac patients with a 12-lead ECG and a cardiology report,
//! and MRI patients with an imaging report. Media is seeded separately from
//! caller-supplied image bytes. A run keeps going when one patient fails and
//! reports what it managed to create.

use std::sync::Arc;

use cardiolake_core::error::StoreError;
use cardiolake_core::store::{FhirStore, created_id};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::builders::{
    self, Address, ConditionInput, EcgInput, Interpretation, MediaInput, MriReportInput,
    PatientInput, Subject,
};

#[derive(Debug, Clone)]
pub struct CardiacCase {
    pub patient: PatientInput,
    pub condition: String,
    pub snomed_code: String,
    pub heart_rate: u32,
    /// 0 when not measurable.
    pub pr_interval_ms: u32,
    pub qrs_duration_ms: u32,
    pub qt_interval_ms: u32,
    /// Overrides the generated ECG finding and report conclusion.
    pub reading: Option<EcgReading>,
}

#[derive(Debug, Clone)]
pub struct EcgReading {
    pub finding: String,
    pub conclusion: String,
    pub interpretation: Interpretation,
}

impl CardiacCase {
    fn ecg(&self) -> EcgInput {
        let (finding, interpretation) = match &self.reading {
            Some(r) => (r.finding.clone(), Some(r.interpretation)),
            None => (
                format!("ECG findings consistent with {}", self.condition),
                None,
            ),
        };
        EcgInput {
            heart_rate: self.heart_rate,
            pr_interval_ms: self.pr_interval_ms,
            qrs_duration_ms: self.qrs_duration_ms,
            qt_interval_ms: self.qt_interval_ms,
            finding,
            interpretation,
        }
    }

    fn conclusion(&self) -> String {
        match &self.reading {
            Some(r) => r.conclusion.clone(),
            None => format!(
                "ECG consistent with {}. Recommend cardiology follow-up.",
                self.condition
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MriCase {
    pub patient: PatientInput,
    pub condition: String,
    pub study: String,
    pub findings: String,
}

/// Image bytes to attach to an existing patient.
#[derive(Debug, Clone)]
pub struct MediaCase {
    pub patient_id: String,
    pub patient_name: Option<String>,
    pub media: MediaInput,
}

fn person(given: &[&str], family: &str, gender: &str, birth_date: &str) -> PatientInput {
    PatientInput {
        given: given.iter().map(|s| s.to_string()).collect(),
        family: family.into(),
        gender: gender.into(),
        birth_date: birth_date.into(),
        address: None,
    }
}

fn cardiac(
    patient: PatientInput,
    condition: &str,
    snomed: &str,
    [hr, pr, qrs, qt]: [u32; 4],
) -> CardiacCase {
    CardiacCase {
        patient,
        condition: condition.into(),
        snomed_code: snomed.into(),
        heart_rate: hr,
        pr_interval_ms: pr,
        qrs_duration_ms: qrs,
        qt_interval_ms: qt,
        reading: None,
    }
}

/// Five cardiac patients. Addresses are filled in at seed time.
pub fn cardiac_patients() -> Vec<CardiacCase> {
    vec![
        cardiac(
            person(&["Sarah", "Ann"], "Johnson", "female", "1958-03-22"),
            "Atrial fibrillation",
            "49436004",
            [110, 0, 85, 380],
        ),
        cardiac(
            person(&["Robert", "James"], "Williams", "male", "1972-11-08"),
            "Myocardial infarction",
            "22298006",
            [95, 180, 105, 440],
        ),
        cardiac(
            person(&["Maria", "Elena"], "Garcia", "female", "1965-07-15"),
            "Heart failure",
            "84114007",
            [88, 170, 110, 450],
        ),
        cardiac(
            person(&["David", "Lee"], "Chen", "male", "1980-02-28"),
            "Ventricular tachycardia",
            "25569003",
            [145, 155, 120, 320],
        ),
        cardiac(
            person(&["Jennifer", "Marie"], "Brown", "female", "1955-09-12"),
            "Coronary artery disease",
            "53741008",
            [72, 165, 92, 415],
        ),
    ]
}

/// The single fully-specified ECG reference patient.
pub fn reference_ecg_patient() -> CardiacCase {
    let mut patient = person(&["John", "Michael"], "Smith", "male", "1965-08-15");
    patient.address = Some(Address {
        line: "123 Heart St".into(),
        city: "Seattle".into(),
        state: "WA".into(),
        postal_code: "98101".into(),
        country: "US".into(),
    });
    let mut case = cardiac(
        patient,
        "Coronary artery disease",
        "53741008",
        [75, 165, 95, 410],
    );
    case.reading = Some(EcgReading {
        finding: "Normal sinus rhythm with occasional PVCs".into(),
        conclusion: "Normal sinus rhythm with occasional premature ventricular contractions. \
                     No acute ST-T wave changes. Recommend follow-up in 6 months."
            .into(),
        interpretation: Interpretation::Normal,
    });
    case
}

fn mri(patient: PatientInput, condition: &str, study: &str, findings: &str) -> MriCase {
    MriCase {
        patient,
        condition: condition.into(),
        study: study.into(),
        findings: findings.into(),
    }
}

pub fn mri_patients() -> Vec<MriCase> {
    vec![
        mri(
            person(&["Michael"], "Anderson", "male", "1965-03-15"),
            "Brain tumor (glioblastoma)",
            "Brain MRI",
            "4.2 cm mass in right frontal lobe with surrounding edema and mass effect",
        ),
        mri(
            person(&["Patricia"], "Martinez", "female", "1972-08-22"),
            "Multiple sclerosis",
            "Brain and Spine MRI",
            "Multiple periventricular white matter lesions consistent with demyelinating disease",
        ),
        mri(
            person(&["James"], "Thompson", "male", "1958-11-30"),
            "Lumbar disc herniation",
            "Lumbar Spine MRI",
            "L4-L5 disc herniation with nerve root compression",
        ),
        mri(
            person(&["Linda"], "Davis", "female", "1980-05-18"),
            "Meniscal tear",
            "Knee MRI",
            "Medial meniscus tear with joint effusion",
        ),
        mri(
            person(&["Robert"], "Wilson", "male", "1955-09-07"),
            "Stroke (ischemic)",
            "Brain MRI with DWI",
            "Acute infarct in left middle cerebral artery territory",
        ),
    ]
}

const STREETS: [&str; 4] = ["Main", "Oak", "Maple", "Cedar"];
const CITIES: [&str; 4] = ["Seattle", "Portland", "San Francisco", "Los Angeles"];
const STATES: [&str; 3] = ["WA", "OR", "CA"];

fn pick<R: Rng + ?Sized>(rng: &mut R, options: &[&str]) -> String {
    options.choose(rng).copied().unwrap_or_default().to_string()
}

/// A plausible West Coast address.
pub fn random_address<R: Rng + ?Sized>(rng: &mut R) -> Address {
    let number = rng.random_range(100..=9999);
    let street = pick(rng, &STREETS);
    Address {
        line: format!("{number} {street} St"),
        city: pick(rng, &CITIES),
        state: pick(rng, &STATES),
        postal_code: rng.random_range(90000..=99999).to_string(),
        country: "US".into(),
    }
}

/// What one seeded patient produced, as `Type/id` references.
#[derive(Debug, Clone, Serialize)]
pub struct SeededPatient {
    pub name: String,
    pub patient_id: String,
    pub label: String,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedReport {
    pub created: Vec<SeededPatient>,
    pub failures: Vec<SeedFailure>,
}

impl SeedReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, name: String, outcome: Result<SeededPatient, StoreError>) {
        match outcome {
            Ok(seeded) => {
                info!(patient = %seeded.name, id = %seeded.patient_id, resources = seeded.resources.len(), "Seeded patient");
                self.created.push(seeded);
            }
            Err(e) => {
                warn!(patient = %name, error = %e, "Seeding failed, continuing");
                self.failures.push(SeedFailure {
                    name,
                    error: e.to_string(),
                });
            }
        }
    }
}

pub struct Seeder {
    store: Arc<dyn FhirStore>,
}

impl Seeder {
    pub fn new(store: Arc<dyn FhirStore>) -> Self {
        Self { store }
    }

    async fn create(&self, resource: &Value, made: &mut Vec<String>) -> Result<String, StoreError> {
        let created = self.store.create(resource).await?;
        let id = created_id(&created)?;
        let kind = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or("Resource");
        made.push(format!("{kind}/{id}"));
        Ok(id)
    }

    /// Patients without an address get a random one; condition onsets fall
    /// 30 to 365 days back.
    pub async fn seed_cardiac(&self, cases: &[CardiacCase]) -> SeedReport {
        let now = Utc::now();
        let extras: Vec<(Address, i64)> = {
            let mut rng = rand::rng();
            cases
                .iter()
                .map(|_| (random_address(&mut rng), rng.random_range(30..=365)))
                .collect()
        };

        let mut report = SeedReport::default();
        for (case, (address, onset_days)) in cases.iter().zip(extras) {
            let mut case = case.clone();
            case.patient.address.get_or_insert(address);
            let onset = now - Duration::days(onset_days);
            let outcome = self.seed_cardiac_case(&case, onset, now).await;
            report.record(case.patient.display_name(), outcome);
        }
        report
    }

    async fn seed_cardiac_case(
        &self,
        case: &CardiacCase,
        onset: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<SeededPatient, StoreError> {
        let mut made = Vec::new();
        let patient_id = self.create(&builders::patient(&case.patient), &mut made).await?;
        let subject = Subject::new(&patient_id);

        let condition = ConditionInput {
            text: case.condition.clone(),
            snomed_code: Some(case.snomed_code.clone()),
            onset: Some(onset),
        };
        self.create(&builders::condition(&subject, &condition, now), &mut made)
            .await?;

        let observation_id = self
            .create(&builders::ecg_observation(&subject, &case.ecg(), now), &mut made)
            .await?;
        self.create(
            &builders::ecg_report(&subject, &observation_id, &case.conclusion(), now),
            &mut made,
        )
        .await?;

        Ok(SeededPatient {
            name: case.patient.display_name(),
            patient_id,
            label: case.condition.clone(),
            resources: made,
        })
    }

    pub async fn seed_mri(&self, cases: &[MriCase]) -> SeedReport {
        let now = Utc::now();
        let mut report = SeedReport::default();
        for case in cases {
            let outcome = self.seed_mri_case(case, now).await;
            report.record(case.patient.display_name(), outcome);
        }
        report
    }

    async fn seed_mri_case(
        &self,
        case: &MriCase,
        now: DateTime<Utc>,
    ) -> Result<SeededPatient, StoreError> {
        let mut made = Vec::new();
        let name = case.patient.display_name();
        let patient_id = self.create(&builders::patient(&case.patient), &mut made).await?;
        let subject = Subject::new(&patient_id).with_display(&name);

        let condition = ConditionInput {
            text: case.condition.clone(),
            snomed_code: None,
            onset: None,
        };
        self.create(&builders::condition(&subject, &condition, now), &mut made)
            .await?;

        let report = MriReportInput {
            study: case.study.clone(),
            findings: case.findings.clone(),
            attach_findings: true,
        };
        self.create(&builders::mri_report(&subject, &report, now), &mut made)
            .await?;

        Ok(SeededPatient {
            name,
            patient_id,
            label: case.condition.clone(),
            resources: made,
        })
    }

    pub async fn seed_media(&self, cases: &[MediaCase]) -> SeedReport {
        let now = Utc::now();
        let mut report = SeedReport::default();
        for case in cases {
            let name = case
                .patient_name
                .clone()
                .unwrap_or_else(|| case.patient_id.clone());
            let mut subject = Subject::new(&case.patient_id);
            if let Some(display) = &case.patient_name {
                subject = subject.with_display(display);
            }
            let mut made = Vec::new();
            let created = self
                .create(&builders::media(&subject, &case.media, now), &mut made)
                .await;
            let outcome = created.map(|_| SeededPatient {
                    name: name.clone(),
                    patient_id: case.patient_id.clone(),
                    label: case.media.title.clone(),
                    resources: made,
                });
            report.record(name, outcome);
        }
        report
    }
}
