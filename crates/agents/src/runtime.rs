//! Bedrock agent runtime client.
//!
//! `InvokeAgent` is a signed `POST` whose reply is an event stream of `chunk`
//! events, each carrying base64 text in a small JSON payload. The response
//! body is read on a spawned task and forwarded as [`ResponseFragment`]s
//! through a bounded channel, in order.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use cardiolake_config::AppConfig;
use cardiolake_core::agent::{AgentReference, AgentRuntime, FragmentStream, ResponseFragment};
use cardiolake_core::error::AgentError;
use cardiolake_security::{AwsCredentials, SigV4Signer, SignableRequest};
use futures::{Stream, StreamExt};
use reqwest::{Method, Url};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::event_stream::{Decoder, Message};

const SERVICE: &str = "bedrock";
const EVENT_STREAM: &str = "application/vnd.amazon.eventstream";

pub struct BedrockAgentClient {
    base_url: Url,
    signer: SigV4Signer,
    client: reqwest::Client,
}

impl BedrockAgentClient {
    pub fn new(base_url: &str, signer: SigV4Signer, timeout: Duration) -> Result<Self, AgentError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AgentError::NotConfigured(format!("bad agent runtime URL {base_url}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            base_url,
            signer,
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AgentError> {
        let credentials = AwsCredentials::from_config(config)
            .map_err(|e| AgentError::NotConfigured(e.to_string()))?;
        let signer = SigV4Signer::new(credentials, config.aws.region.clone(), SERVICE);
        Self::new(
            &config.agents.base_url(&config.aws.region),
            signer,
            Duration::from_secs(config.agents.request_timeout_secs),
        )
    }

    fn invoke_url(&self, agent: &AgentReference, session_id: &str) -> Result<Url, AgentError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AgentError::NotConfigured("agent runtime URL cannot take a path".into()))?
            .pop_if_empty()
            .extend([
                "agents",
                agent.agent_id.as_str(),
                "agentAliases",
                agent.alias_id.as_str(),
                "sessions",
                session_id,
                "text",
            ]);
        Ok(url)
    }

    fn prepare(
        &self,
        agent: &AgentReference,
        session_id: &str,
        input_text: &str,
    ) -> Result<reqwest::Request, AgentError> {
        let url = self.invoke_url(agent, session_id)?;
        let body = serde_json::to_vec(&serde_json::json!({ "inputText": input_text }))
            .map_err(|e| AgentError::Decode(e.to_string()))?;

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(AgentError::NotConfigured(format!("URL has no host: {url}")));
            }
        };
        let content_headers = vec![("content-type".to_string(), "application/json".to_string())];
        let signed = self
            .signer
            .sign(&SignableRequest {
                method: "POST",
                host: &host,
                path: url.path(),
                query: &[],
                headers: &content_headers,
                body: &body,
            })
            .map_err(|e| AgentError::AuthenticationFailed(e.to_string()))?;

        let mut builder = self
            .client
            .request(Method::POST, url)
            .header("content-type", "application/json")
            .header("accept", EVENT_STREAM);
        for (name, value) in signed.iter() {
            builder = builder.header(name, value);
        }
        builder
            .body(body)
            .build()
            .map_err(|e| AgentError::NotConfigured(format!("cannot build request: {e}")))
    }
}

#[async_trait]
impl AgentRuntime for BedrockAgentClient {
    fn name(&self) -> &str {
        "bedrock-agent-runtime"
    }

    async fn invoke(
        &self,
        agent: &AgentReference,
        session_id: &str,
        input_text: &str,
    ) -> Result<FragmentStream, AgentError> {
        let request = self.prepare(agent, session_id, input_text)?;
        debug!(
            agent_id = %agent.agent_id,
            alias_id = %agent.alias_id,
            session_id,
            prompt_chars = input_text.len(),
            "Invoking agent"
        );

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| AgentError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            warn!(status, agent_id = %agent.agent_id, "Agent invocation rejected");
            return Err(status_error(status, body));
        }

        Ok(forward_event_stream(response.bytes_stream()))
    }
}

fn status_error(status: u16, body: String) -> AgentError {
    match status {
        429 => AgentError::Throttled(body),
        401 | 403 => AgentError::AuthenticationFailed(body),
        _ => AgentError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

#[derive(Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    bytes: Option<String>,
}

#[derive(Deserialize)]
struct ExceptionPayload {
    #[serde(default)]
    message: Option<String>,
}

/// The raw text bytes carried by a message, if it is a `chunk` event.
/// Exceptions and errors become `Err`; other event types are skipped.
fn chunk_bytes(message: &Message) -> Result<Option<Vec<u8>>, AgentError> {
    match message.header_str(":message-type") {
        Some("event") => {}
        Some("exception") => {
            let exception_type = message
                .header_str(":exception-type")
                .unwrap_or("UnknownException")
                .to_string();
            let text = String::from_utf8_lossy(&message.payload).to_string();
            let detail = serde_json::from_str::<ExceptionPayload>(&text)
                .ok()
                .and_then(|p| p.message)
                .unwrap_or(text);
            return Err(AgentError::Remote {
                exception_type,
                message: detail,
            });
        }
        Some("error") => {
            return Err(AgentError::Remote {
                exception_type: message
                    .header_str(":error-code")
                    .unwrap_or("UnknownError")
                    .to_string(),
                message: message
                    .header_str(":error-message")
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        other => {
            trace!(message_type = ?other, "Skipping message");
            return Ok(None);
        }
    }

    if message.header_str(":event-type") != Some("chunk") {
        trace!(event_type = ?message.header_str(":event-type"), "Skipping non-chunk event");
        return Ok(None);
    }

    let payload: ChunkPayload = serde_json::from_slice(&message.payload)
        .map_err(|e| AgentError::Decode(format!("chunk payload: {e}")))?;
    let Some(encoded) = payload.bytes else {
        return Ok(None);
    };
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map(Some)
        .map_err(|e| AgentError::Decode(format!("chunk bytes: {e}")))
}

/// Holds back an incomplete UTF-8 sequence at the end of a chunk until the
/// next chunk completes it.
#[derive(Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let valid_up_to = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            // genuinely invalid: let the lossy conversion replace it
            Err(_) => self.pending.len(),
        };
        let ready: Vec<u8> = self.pending.drain(..valid_up_to).collect();
        String::from_utf8_lossy(&ready).into_owned()
    }

    fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&rest).into_owned()
    }
}

/// Decode an event-stream body on a spawned task and forward its text.
///
/// Ends with a `done` fragment on a clean end of stream, or with a single
/// error if the transport, framing or the remote side fails.
pub fn forward_event_stream<S, B, E>(mut body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let (tx, rx) = tokio::sync::mpsc::channel(64);

    tokio::spawn(async move {
        let mut decoder = Decoder::new();
        let mut carry = Utf8Carry::default();

        while let Some(chunk_result) = body.next().await {
            let bytes = match chunk_result {
                Ok(b) => b,
                Err(e) => {
                    let _ = tx.send(Err(AgentError::StreamInterrupted(e.to_string()))).await;
                    return;
                }
            };
            decoder.push(bytes.as_ref());

            loop {
                let message = match decoder.next_message() {
                    Ok(Some(m)) => m,
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(AgentError::Decode(e.to_string()))).await;
                        return;
                    }
                };
                match chunk_bytes(&message) {
                    Ok(Some(raw)) => {
                        let text = carry.push(&raw);
                        if !text.is_empty() && tx.send(Ok(ResponseFragment::text(text))).await.is_err() {
                            // receiver gone
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }
        }

        if let Err(e) = decoder.finish() {
            let _ = tx.send(Err(AgentError::StreamInterrupted(e.to_string()))).await;
            return;
        }
        let rest = carry.finish();
        if !rest.is_empty() {
            let _ = tx.send(Ok(ResponseFragment::text(rest))).await;
        }
        let _ = tx.send(Ok(ResponseFragment::done())).await;
    });

    rx
}
