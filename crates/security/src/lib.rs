//! Request signing for CardioLake.
//!
//! Provides:
//! - **Credentials**: static AWS access keys from config or environment
//! - **SigV4**: AWS Signature Version 4 for the datastore and agent runtime

pub mod credentials;
pub mod sigv4;

pub use credentials::AwsCredentials;
pub use sigv4::{SigV4Signer, SignableRequest, SignedHeaders, canonical_query};

/// Errors from signing.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("No AWS credentials configured (set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY)")]
    MissingCredentials,

    #[error("Cannot sign request: {0}")]
    InvalidRequest(String),
}
