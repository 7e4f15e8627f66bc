//! # CardioLake Core
//!
//! Domain types, traits, and error definitions shared by every CardioLake
//! crate. Nothing in here talks to the network: the datastore and the agent
//! runtime are both described as traits, and the concrete HTTP clients live in
//! `cardiolake-fhir` and `cardiolake-agents`.
//!
//! ## Layout
//!
//! - [`fhir`] — resource types, search parameters and the search `Bundle`
//! - [`patient`] — the flattened views handed to API consumers
//! - [`store`] — the [`FhirStore`] trait
//! - [`agent`] — agent references, specialists and the [`AgentRuntime`] trait

pub mod agent;
pub mod error;
pub mod fhir;
pub mod patient;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentReference, AgentRuntime, FragmentStream, ResponseFragment, Specialist};
pub use error::{AgentError, Error, Result, StoreError};
pub use fhir::{Bundle, BundleEntry, ResourceType, SearchParams};
pub use patient::{Measurement, PatientRecord, PatientSummary, UNKNOWN};
pub use store::FhirStore;
