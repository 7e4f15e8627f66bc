//! Static AWS credentials.

use cardiolake_config::AppConfig;

use crate::SigningError;

/// An access key pair plus optional session token.
///
/// `Debug` never prints the secret or the token.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl AwsCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    /// Credentials from the loaded configuration (file + environment).
    pub fn from_config(config: &AppConfig) -> Result<Self, SigningError> {
        match (&config.aws.access_key_id, &config.aws.secret_access_key) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => Ok(Self::new(
                key.clone(),
                secret.clone(),
                config.aws.session_token.clone().filter(|t| !t.is_empty()),
            )),
            _ => Err(SigningError::MissingCredentials),
        }
    }
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}
