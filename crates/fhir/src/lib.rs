//! FHIR side of CardioLake.
//!
//! - [`builders`]: pure constructors for the resources we write
//! - [`client`]: SigV4-signed HealthLake REST client
//! - [`summary`]: patient list, lookup and the flattened summary
//! - [`memory`]: in-memory store for demo mode and tests
//! - [`seed`]: synthetic cardiac and MRI datasets

pub mod builders;
pub mod client;
pub mod memory;
pub mod observations;
pub mod seed;
pub mod summary;

pub use client::HealthLakeClient;
pub use memory::InMemoryStore;
pub use observations::parse_measurements;
pub use seed::{SeedReport, Seeder};
pub use summary::{PatientCheck, SummaryService};
