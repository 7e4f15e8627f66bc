//! Signed HealthLake REST client.
//!
//! One resource type per path segment under the datastore's `r4/` base.
//! Every request is SigV4-signed for service `healthlake`; the query string is
//! written with [`canonical_query`] so the wire form and the signed form agree.

use std::time::Duration;

use async_trait::async_trait;
use cardiolake_config::AppConfig;
use cardiolake_core::error::StoreError;
use cardiolake_core::fhir::{Bundle, ResourceType, SearchParams};
use cardiolake_core::store::FhirStore;
use cardiolake_security::{AwsCredentials, SigV4Signer, SignableRequest, canonical_query};
use reqwest::{Method, Url};
use serde_json::Value;
use tracing::{debug, warn};

pub const FHIR_JSON: &str = "application/fhir+json";
const SERVICE: &str = "healthlake";

pub struct HealthLakeClient {
    base_url: Url,
    signer: SigV4Signer,
    client: reqwest::Client,
}

impl HealthLakeClient {
    /// `base_url` is the datastore's `r4/` root.
    pub fn new(base_url: &str, signer: SigV4Signer, timeout: Duration) -> Result<Self, StoreError> {
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized)
            .map_err(|e| StoreError::InvalidResponse(format!("bad datastore URL {base_url}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            base_url,
            signer,
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let credentials =
            AwsCredentials::from_config(config).map_err(|e| StoreError::Signing(e.to_string()))?;
        let signer = SigV4Signer::new(credentials, config.aws.region.clone(), SERVICE);
        Self::new(
            &config.healthlake_url(),
            signer,
            Duration::from_secs(config.healthlake.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resource_url(&self, resource_type: ResourceType) -> Result<Url, StoreError> {
        self.base_url
            .join(resource_type.as_str())
            .map_err(|e| StoreError::InvalidResponse(format!("bad resource URL: {e}")))
    }

    /// Build a signed request. Split out from [`send`](Self::send) so the
    /// exact bytes going on the wire can be inspected.
    fn prepare(
        &self,
        method: Method,
        mut url: Url,
        params: &SearchParams,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Request, StoreError> {
        let query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if query.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&canonical_query(&query)));
        }

        let host = signing_host(&url)?;
        let content_headers: Vec<(String, String)> = if body.is_some() {
            vec![("content-type".into(), FHIR_JSON.into())]
        } else {
            Vec::new()
        };
        let payload = body.unwrap_or_default();

        let signed = self
            .signer
            .sign(&SignableRequest {
                method: method.as_str(),
                host: &host,
                path: url.path(),
                query: &query,
                headers: &content_headers,
                body: &payload,
            })
            .map_err(|e| StoreError::Signing(e.to_string()))?;

        let mut builder = self
            .client
            .request(method, url)
            .header("accept", FHIR_JSON);
        for (name, value) in signed.iter().chain(
            content_headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        ) {
            builder = builder.header(name, value);
        }
        if !payload.is_empty() {
            builder = builder.body(payload);
        }
        builder
            .build()
            .map_err(|e| StoreError::InvalidResponse(format!("cannot build request: {e}")))
    }

    async fn send(&self, request: reqwest::Request) -> Result<Value, StoreError> {
        let url = request.url().clone();
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !(status == 200 || status == 201) {
            let body = response.text().await.unwrap_or_default();
            warn!(status, url = %url, "HealthLake request failed");
            return Err(status_error(status, body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl FhirStore for HealthLakeClient {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn search(
        &self,
        resource_type: ResourceType,
        params: &SearchParams,
    ) -> Result<Bundle, StoreError> {
        debug!(resource = %resource_type, params = ?params, "HealthLake search");
        let url = self.resource_url(resource_type)?;
        let request = self.prepare(Method::GET, url, params, None)?;
        let body = self.send(request).await?;
        serde_json::from_value(body).map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    async fn create(&self, resource: &Value) -> Result<Value, StoreError> {
        let resource_type = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .and_then(ResourceType::parse)
            .ok_or_else(|| {
                StoreError::InvalidResponse("resource has no supported resourceType".into())
            })?;
        let payload =
            serde_json::to_vec(resource).map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        debug!(resource = %resource_type, bytes = payload.len(), "HealthLake create");
        let url = self.resource_url(resource_type)?;
        let request = self.prepare(Method::POST, url, &SearchParams::new(), Some(payload))?;
        self.send(request).await
    }
}

/// `host` or `host:port` exactly as reqwest will send it.
fn signing_host(url: &Url) -> Result<String, StoreError> {
    let host = url
        .host_str()
        .ok_or_else(|| StoreError::Signing(format!("URL has no host: {url}")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn status_error(status: u16, body: String) -> StoreError {
    match status {
        401 | 403 => StoreError::AuthenticationFailed(body),
        _ => StoreError::ApiError {
            status_code: status,
            message: body,
        },
    }
}
