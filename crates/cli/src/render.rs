//! Plain-text rendering of summaries and agent replies for the terminal.

use std::fmt::Write;

use cardiolake_agents::{AgentReply, StructuredReply};
use cardiolake_core::patient::PatientSummary;
use serde_json::Value;

fn level_icon(level: &str) -> &'static str {
    match level {
        "high" | "immediate" => "🔴",
        "medium" | "soon" => "🟡",
        "low" | "routine" => "🟢",
        _ => "⚪",
    }
}

fn field<'a>(item: &'a Value, key: &str, default: &'a str) -> &'a str {
    item.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn items<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

pub fn summary(s: &PatientSummary) -> String {
    let list = |v: &[String]| {
        if v.is_empty() {
            "none".to_string()
        } else {
            v.join(", ")
        }
    };
    let mut out = String::new();
    let _ = writeln!(out, "  Patient:      {} ({})", s.name, s.id);
    let _ = writeln!(out, "  Gender:       {}", s.gender);
    let _ = writeln!(out, "  Birth date:   {}", s.birth_date);
    let _ = writeln!(out, "  Conditions:   {}", list(&s.conditions));
    let _ = writeln!(out, "  Medications:  {}", list(&s.medications));
    let _ = writeln!(out, "  Allergies:    {}", list(&s.allergies));
    let _ = writeln!(out, "  ECG on file:  {}", if s.has_ecg { "yes" } else { "no" });
    let _ = writeln!(out, "  Reports:      {}", s.mri_reports_count);
    out
}

/// The answer followed by its card, laid out by `ui_type`.
pub fn reply(reply: &AgentReply) -> String {
    let env = reply.envelope();
    let mut out = String::new();
    let _ = writeln!(out, "{}", env.answer);
    let _ = writeln!(out);
    card(&env, &mut out);
    if !env.sources.is_empty() {
        let _ = writeln!(out, "  Sources: {}", env.sources.join(", "));
    }
    if let Some(confidence) = &env.confidence {
        let _ = writeln!(out, "  Confidence: {confidence}");
    }
    out
}

fn card(env: &StructuredReply, out: &mut String) {
    let data = &env.data;
    match env.ui_type.as_str() {
        "risk_assessment" => {
            let _ = writeln!(out, "  ── Health Risk Assessment ──");
            for risk in items(data, "risks") {
                let level = field(risk, "level", "unknown").to_lowercase();
                let _ = writeln!(
                    out,
                    "  {} {} - {}",
                    level_icon(&level),
                    field(risk, "name", "?"),
                    level.to_uppercase()
                );
                let _ = writeln!(out, "     {}", field(risk, "description", ""));
            }
        }
        "comparison" => {
            let _ = writeln!(out, "  ── Specialist Comparison ──");
            let specialists = items(data, "specialists");
            let first = specialists.first().and_then(Value::as_str).unwrap_or("Specialist 1");
            let second = specialists.get(1).and_then(Value::as_str).unwrap_or("Specialist 2");
            for finding in items(data, "findings") {
                let _ = writeln!(out, "  {}", field(finding, "aspect", "?"));
                let _ = writeln!(out, "     {first}: {}", field(finding, "specialist1", "N/A"));
                let _ = writeln!(out, "     {second}: {}", field(finding, "specialist2", "N/A"));
            }
        }
        "timeline" => {
            let _ = writeln!(out, "  ── Follow-up Schedule ──");
            for apt in items(data, "appointments") {
                let priority = field(apt, "priority", "medium").to_lowercase();
                let _ = writeln!(
                    out,
                    "  {} {} - {}",
                    level_icon(&priority),
                    field(apt, "type", "?"),
                    field(apt, "timeframe", "?")
                );
                let _ = writeln!(out, "     Reason: {}", field(apt, "reason", ""));
            }
        }
        "action_items" => {
            let _ = writeln!(out, "  ── Action Plan ──");
            let mut actions: Vec<&Value> = items(data, "actions").iter().collect();
            actions.sort_by_key(|a| a.get("priority").and_then(Value::as_u64).unwrap_or(999));
            for action in actions {
                let urgency = field(action, "urgency", "routine").to_lowercase();
                let priority = action
                    .get("priority")
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".into());
                let _ = writeln!(
                    out,
                    "  {} {}. {}",
                    level_icon(&urgency),
                    priority,
                    field(action, "action", "?")
                );
                let _ = writeln!(
                    out,
                    "     Urgency: {} | Recommended by: {}",
                    urgency.to_uppercase(),
                    field(action, "specialist", "N/A")
                );
            }
        }
        "key_findings" => {
            let _ = writeln!(out, "  ── Key Findings ──");
            for finding in items(data, "findings") {
                let _ = writeln!(out, "  {}", field(finding, "category", "?"));
                let _ = writeln!(out, "     {}", field(finding, "finding", ""));
                let _ = writeln!(out, "     Significance: {}", field(finding, "significance", ""));
            }
        }
        "medication_map" => {
            let _ = writeln!(out, "  ── Medication Overview ──");
            for med in items(data, "medications") {
                let treats: Vec<&str> = items(med, "conditions")
                    .iter()
                    .filter_map(Value::as_str)
                    .collect();
                let _ = writeln!(out, "  💊 {}", field(med, "drug", "?"));
                let _ = writeln!(out, "     Treats: {}", treats.join(", "));
                let _ = writeln!(out, "     Prescribed by: {}", field(med, "specialist", "N/A"));
            }
        }
        "detailed_card" => {
            let _ = writeln!(out, "  ── {} ──", field(data, "title", "Details"));
            let summary = field(data, "summary", "");
            if !summary.is_empty() {
                let _ = writeln!(out, "  {summary}");
            }
            for detail in items(data, "details") {
                let text = detail.as_str().map(str::to_string).unwrap_or_else(|| detail.to_string());
                let _ = writeln!(out, "   - {text}");
            }
            let implications = field(data, "implications", "");
            if !implications.is_empty() {
                let _ = writeln!(out, "  Implications: {implications}");
            }
        }
        other => {
            let _ = writeln!(out, "  (unknown card type: {other})");
        }
    }
}
