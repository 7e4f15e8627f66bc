//! The structured reply shape agents are asked to answer in.
//!
//! Agents are prompted to reply with a JSON object carrying `answer`,
//! `ui_type`, `data`, `sources` and `confidence`. They don't always comply, so
//! a reply is either [`AgentReply::Structured`] (the JSON object, kept exactly
//! as received) or [`AgentReply::Fallback`] (the raw text, shown through a
//! generic card).
//! Falling back is normal operation, not an error.

use serde::Serialize;
use serde_json::{Map, Value, json};

pub const DETAILED_CARD: &str = "detailed_card";

/// `ui_type` values the presentation layer knows how to render.
pub const UI_TYPES: [&str; 7] = [
    "risk_assessment",
    "comparison",
    "timeline",
    "action_items",
    DETAILED_CARD,
    "key_findings",
    "medication_map",
];

/// Characters of raw text kept in a fallback card's summary.
pub const SUMMARY_CHARS: usize = 200;

/// A read-only view of a reply for rendering. Missing or oddly typed fields
/// are filled in here; the reply itself is never rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredReply {
    pub answer: String,
    pub ui_type: String,
    pub data: Value,
    pub sources: Vec<String>,
    pub confidence: Option<String>,
}

impl StructuredReply {
    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            answer: object
                .get("answer")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            ui_type: object
                .get("ui_type")
                .and_then(Value::as_str)
                .unwrap_or(DETAILED_CARD)
                .to_string(),
            data: object.get("data").cloned().unwrap_or_else(|| json!({})),
            sources: object
                .get("sources")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(display).collect())
                .unwrap_or_default(),
            confidence: object
                .get("confidence")
                .filter(|c| !c.is_null())
                .map(display),
        }
    }

    /// `data.title`, when the data block has one.
    pub fn title(&self) -> Option<&str> {
        self.data.get("title").and_then(Value::as_str)
    }
}

fn display(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

/// Serializes as the agent's own JSON object, or as the fallback card.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentReply {
    /// A JSON object with a string `answer`, kept exactly as received.
    Structured(Map<String, Value>),
    Fallback { raw: String },
}

impl AgentReply {
    /// Interpret the concatenated reply text.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(Value::Object(object)) if object.get("answer").is_some_and(Value::is_string) => {
                Self::Structured(object)
            }
            Ok(_) => {
                tracing::debug!(chars = text.chars().count(), "Agent reply is JSON but not an answer object, using fallback card");
                Self::fallback(text)
            }
            Err(e) => {
                tracing::debug!(error = %e, chars = text.chars().count(), "Agent reply is not structured, using fallback card");
                Self::fallback(text)
            }
        }
    }

    fn fallback(text: &str) -> Self {
        Self::Fallback {
            raw: text.to_string(),
        }
    }

    /// What Q&A answers when nothing has been generated yet.
    pub fn no_data() -> Self {
        let mut object = Map::new();
        object.insert(
            "answer".into(),
            "No cached reports available. Please generate a comprehensive report first.".into(),
        );
        object.insert("ui_type".into(), DETAILED_CARD.into());
        object.insert(
            "data".into(),
            json!({
                "title": "No Data",
                "summary": "Generate a comprehensive report to ask questions.",
                "details": [],
                "implications": ""
            }),
        );
        Self::Structured(object)
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn answer(&self) -> &str {
        match self {
            Self::Structured(object) => object
                .get("answer")
                .and_then(Value::as_str)
                .unwrap_or_default(),
            Self::Fallback { raw } => raw,
        }
    }

    pub fn ui_type(&self) -> &str {
        match self {
            Self::Structured(object) => object
                .get("ui_type")
                .and_then(Value::as_str)
                .unwrap_or(DETAILED_CARD),
            Self::Fallback { .. } => DETAILED_CARD,
        }
    }

    /// The reply as it goes over the wire.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Structured(object) => Value::Object(object.clone()),
            Self::Fallback { raw } => Value::Object(fallback_card(raw)),
        }
    }

    /// The reply in renderable form; fallback text is wrapped in a card.
    pub fn envelope(&self) -> StructuredReply {
        match self {
            Self::Structured(object) => StructuredReply::from_object(object),
            Self::Fallback { raw } => StructuredReply::from_object(&fallback_card(raw)),
        }
    }
}

impl Serialize for AgentReply {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Structured(object) => object.serialize(serializer),
            Self::Fallback { raw } => fallback_card(raw).serialize(serializer),
        }
    }
}

fn fallback_card(raw: &str) -> Map<String, Value> {
    let mut object = Map::new();
    object.insert("answer".into(), raw.into());
    object.insert("ui_type".into(), DETAILED_CARD.into());
    object.insert(
        "data".into(),
        json!({
            "title": "Response",
            "summary": summarize(raw),
            "details": [raw],
            "implications": ""
        }),
    );
    object.insert("sources".into(), json!(["comprehensive"]));
    object.insert("confidence".into(), "medium".into());
    object
}

/// First [`SUMMARY_CHARS`] characters, with `...` when anything was cut.
fn summarize(text: &str) -> String {
    match text.char_indices().nth(SUMMARY_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_reply_is_returned_unchanged() {
        let text = r#"{
            "answer": "Your top risk is arrhythmia.",
            "ui_type": "risk_assessment",
            "data": {"risks": [{"name": "Arrhythmia", "level": "high"}]},
            "sources": ["cardiology", "comprehensive"],
            "confidence": "high"
        }"#;
        let reply = AgentReply::parse(text);
        assert!(!reply.is_fallback());
        let env = reply.envelope();
        assert_eq!(env.ui_type, "risk_assessment");
        assert_eq!(env.data["risks"][0]["level"], "high");
        assert_eq!(env.sources, vec!["cardiology", "comprehensive"]);
        assert_eq!(env.confidence.as_deref(), Some("high"));
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            serde_json::from_str::<Value>(text).unwrap()
        );
    }

    #[test]
    fn minimal_reply_is_not_filled_in() {
        let reply = AgentReply::parse(r#"{"answer": "ok"}"#);
        assert!(!reply.is_fallback());
        assert_eq!(serde_json::to_value(&reply).unwrap(), json!({"answer": "ok"}));

        let env = reply.envelope();
        assert_eq!(env.ui_type, DETAILED_CARD);
        assert_eq!(env.data, json!({}));
        assert!(env.sources.is_empty());
        assert_eq!(env.confidence, None);
        assert_eq!(reply.ui_type(), DETAILED_CARD);
    }

    #[test]
    fn empty_sources_survive_serialization() {
        let text = r#"{"answer": "A", "ui_type": "timeline", "data": {}, "sources": []}"#;
        let reply = AgentReply::parse(text);
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            serde_json::from_str::<Value>(text).unwrap()
        );
    }

    #[test]
    fn numeric_confidence_stays_structured() {
        let text = r#"{"answer": "A", "confidence": 0.9, "sources": ["cardiology", 2], "extra": true}"#;
        let reply = AgentReply::parse(text);
        assert!(!reply.is_fallback());
        assert_eq!(reply.to_value(), serde_json::from_str::<Value>(text).unwrap());

        let env = reply.envelope();
        assert_eq!(env.confidence.as_deref(), Some("0.9"));
        assert_eq!(env.sources, vec!["cardiology", "2"]);
    }

    #[test]
    fn plain_text_falls_back() {
        let reply = AgentReply::parse("The patient should see a cardiologist.");
        assert!(reply.is_fallback());
        let env = reply.envelope();
        assert_eq!(env.answer, "The patient should see a cardiologist.");
        assert_eq!(env.ui_type, DETAILED_CARD);
        assert_eq!(env.title(), Some("Response"));
        assert_eq!(env.data["summary"], "The patient should see a cardiologist.");
        assert_eq!(env.data["details"][0], "The patient should see a cardiologist.");
        assert_eq!(env.data["implications"], "");
        assert_eq!(env.sources, vec!["comprehensive"]);
        assert_eq!(env.confidence.as_deref(), Some("medium"));
    }

    #[test]
    fn json_without_answer_falls_back() {
        assert!(AgentReply::parse(r#"{"ui_type": "timeline"}"#).is_fallback());
        assert!(AgentReply::parse(r#"{"answer": 42}"#).is_fallback());
        assert!(AgentReply::parse(r#"["a", "b"]"#).is_fallback());
        assert!(AgentReply::parse(r#""just a string""#).is_fallback());
        assert!(AgentReply::parse("").is_fallback());
    }

    #[test]
    fn fallback_serializes_as_card() {
        let value = serde_json::to_value(AgentReply::parse("plain")).unwrap();
        assert_eq!(value["answer"], "plain");
        assert_eq!(value["ui_type"], DETAILED_CARD);
        assert_eq!(value["data"]["title"], "Response");
        assert_eq!(value["sources"], json!(["comprehensive"]));
        assert_eq!(value["confidence"], "medium");
    }

    #[test]
    fn long_text_summary_is_truncated() {
        let raw = "é".repeat(250);
        let env = AgentReply::parse(&raw).envelope();
        let summary = env.data["summary"].as_str().unwrap();
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), 203);
        assert_eq!(env.data["details"][0].as_str().unwrap(), raw);
    }

    #[test]
    fn exactly_two_hundred_chars_is_not_truncated() {
        let raw = "x".repeat(200);
        let env = AgentReply::parse(&raw).envelope();
        assert_eq!(env.data["summary"].as_str().unwrap(), raw);
    }

    #[test]
    fn no_data_envelope() {
        let value = serde_json::to_value(AgentReply::no_data()).unwrap();
        assert_eq!(value["ui_type"], DETAILED_CARD);
        assert_eq!(value["data"]["title"], "No Data");
        assert_eq!(
            value["data"]["summary"],
            "Generate a comprehensive report to ask questions."
        );
        assert!(value.get("sources").is_none());
        assert!(value.get("confidence").is_none());
    }
}
