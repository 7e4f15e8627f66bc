//! Subcommands, plus the wiring they share.

pub mod doctor;
pub mod init;
pub mod patients;
pub mod report;
pub mod seed;
pub mod serve;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use cardiolake_agents::{AgentInvoker, BedrockAgentClient};
use cardiolake_config::{AgentDirectory, AppConfig};
use cardiolake_core::store::FhirStore;
use cardiolake_fhir::seed::{cardiac_patients, mri_patients, reference_ecg_patient};
use cardiolake_fhir::{HealthLakeClient, InMemoryStore, Seeder};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// The configured HealthLake datastore.
pub fn datastore(config: &AppConfig) -> Result<Arc<dyn FhirStore>, Box<dyn std::error::Error>> {
    if config.healthlake.datastore_id.trim().is_empty() {
        return Err(
            "No datastore configured. Set HEALTHLAKE_DATASTORE_ID or healthlake.datastore_id."
                .into(),
        );
    }
    if !config.has_credentials() {
        return Err(
            "No AWS credentials. Set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY.".into(),
        );
    }
    Ok(Arc::new(HealthLakeClient::from_config(config)?))
}

/// The Bedrock agent runtime with the agent directory loaded.
pub fn agent_invoker(config: &AppConfig) -> Result<Arc<AgentInvoker>, Box<dyn std::error::Error>> {
    let directory = AgentDirectory::load_from(Path::new(&config.agents.config_path))?;
    let missing = directory.missing();
    if !missing.is_empty() {
        let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
        tracing::warn!(missing = %names.join(", "), "Agent directory is incomplete");
    }
    let runtime = Arc::new(BedrockAgentClient::from_config(config)?);
    Ok(Arc::new(AgentInvoker::new(runtime, directory)))
}

/// An in-memory store holding the cardiac, reference ECG and MRI datasets.
pub async fn demo_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    let seeder = Seeder::new(Arc::new(store.clone()));
    let mut cardiac = cardiac_patients();
    cardiac.push(reference_ecg_patient());
    let reports = [
        seeder.seed_cardiac(&cardiac).await,
        seeder.seed_mri(&mri_patients()).await,
    ];
    for report in &reports {
        for failure in &report.failures {
            tracing::warn!(patient = %failure.name, error = %failure.error, "Demo seed failed");
        }
    }
    store
}
