//! # CardioLake Agents
//!
//! Everything that talks to the remote specialist agents:
//!
//! - [`runtime`] — the SigV4-signed Bedrock `InvokeAgent` client
//! - [`event_stream`] — decoder for the `vnd.amazon.eventstream` reply framing
//! - [`invoke`] — resolve a specialist, send a prompt, collect the reply
//! - [`envelope`] — structured replies and the fallback card
//! - [`pipeline`] — cardiology, radiology and endocrinology reports, then the
//!   comprehensive analysis
//! - [`qa`] — follow-up questions against the cached reports
//! - [`cache`] — the caller-owned [`Session`]
//! - [`templates`] — prompt text and the quick questions

pub mod cache;
pub mod envelope;
pub mod event_stream;
pub mod invoke;
pub mod pipeline;
pub mod qa;
pub mod runtime;
pub mod templates;

#[cfg(test)]
mod test_helpers;

pub use cache::{CachedReportSet, QaExchange, Session};
pub use envelope::{AgentReply, StructuredReply};
pub use invoke::{AgentInvoker, collect_reply, new_session_id};
pub use pipeline::ReportPipeline;
pub use qa::QaProcessor;
pub use runtime::BedrockAgentClient;
pub use templates::{QUICK_QUESTIONS, QuickQuestion};
