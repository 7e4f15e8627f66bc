//! Prompt text sent to the specialist agents.

use cardiolake_core::patient::PatientSummary;
use serde::Serialize;

/// A canned question offered next to the free-text Q&A box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuickQuestion {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const QUICK_QUESTIONS: [QuickQuestion; 6] = [
    QuickQuestion {
        label: "🎯 Top Risks",
        prompt: "What are my top 3 health risks?",
    },
    QuickQuestion {
        label: "📅 Follow-ups",
        prompt: "What follow-up appointments do I need?",
    },
    QuickQuestion {
        label: "🔄 Compare",
        prompt: "Compare findings across all specialists",
    },
    QuickQuestion {
        label: "💊 Medications",
        prompt: "What medications address my conditions?",
    },
    QuickQuestion {
        label: "⚠️ Most Concerning",
        prompt: "Explain my most concerning finding",
    },
    QuickQuestion {
        label: "✅ Action Plan",
        prompt: "What should I do first?",
    },
];

/// Look a quick question up by its label, ignoring the emoji prefix and case.
pub fn quick_question(label: &str) -> Option<&'static QuickQuestion> {
    let wanted = label.trim().to_lowercase();
    QUICK_QUESTIONS.iter().find(|q| {
        let plain = q
            .label
            .trim_start_matches(|c: char| !c.is_ascii_alphanumeric())
            .to_lowercase();
        plain == wanted || q.label.to_lowercase() == wanted
    })
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

pub fn cardiology_prompt(summary: &PatientSummary) -> String {
    let ecg = if summary.has_ecg {
        "ECG observation on file"
    } else {
        "No ECG on file"
    };
    format!(
        "Patient: {}\nGender: {}\nBirth Date: {}\nConditions: {}\nECG: {}\nMedications: {}\nAllergies: {}\n\nProvide a cardiology assessment.",
        summary.name,
        summary.gender,
        summary.birth_date,
        list_or_none(&summary.conditions),
        ecg,
        list_or_none(&summary.medications),
        list_or_none(&summary.allergies),
    )
}

pub fn radiology_prompt(summary: &PatientSummary) -> String {
    format!(
        "Patient: {}\nConditions: {}\nImaging reports on file: {}\n\nProvide a radiology assessment.",
        summary.name,
        list_or_none(&summary.conditions),
        summary.mri_reports_count,
    )
}

pub fn endocrinology_prompt(summary: &PatientSummary) -> String {
    format!(
        "Patient: {}\nGender: {}\nBirth Date: {}\nConditions: {}\nMedications: {}\n\nProvide an endocrinology assessment.",
        summary.name,
        summary.gender,
        summary.birth_date,
        list_or_none(&summary.conditions),
        list_or_none(&summary.medications),
    )
}

/// The orchestrator sees the three specialist reports, never the raw record.
pub fn orchestrator_prompt(
    summary: &PatientSummary,
    cardiology: &str,
    radiology: &str,
    endocrinology: &str,
) -> String {
    format!(
        "Patient: {} (ID: {})\n\nCARDIOLOGY: {}\nRADIOLOGY: {}\nENDOCRINOLOGY: {}\n\nGenerate comprehensive report.",
        summary.name, summary.id, cardiology, radiology, endocrinology,
    )
}

pub fn question_prompt(context: &str, question: &str) -> String {
    format!(
        "{context}\n\nUSER QUESTION: {question}\n\nRespond in JSON format with: answer, ui_type, data, sources, confidence"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sarah() -> PatientSummary {
        let mut s = PatientSummary::unknown("6df562fc");
        s.name = "Sarah Johnson".into();
        s.gender = "female".into();
        s.conditions = vec!["Atrial fibrillation".into()];
        s.has_ecg = true;
        s.mri_reports_count = 1;
        s
    }

    #[test]
    fn six_quick_questions() {
        assert_eq!(QUICK_QUESTIONS.len(), 6);
        assert_eq!(QUICK_QUESTIONS[0].prompt, "What are my top 3 health risks?");
        assert_eq!(QUICK_QUESTIONS[5].label, "✅ Action Plan");
    }

    #[test]
    fn quick_question_lookup() {
        assert_eq!(
            quick_question("medications").unwrap().prompt,
            "What medications address my conditions?"
        );
        assert_eq!(
            quick_question("⚠️ Most Concerning").unwrap().prompt,
            "Explain my most concerning finding"
        );
        assert!(quick_question("weather").is_none());
    }

    #[test]
    fn cardiology_prompt_lists_record() {
        let prompt = cardiology_prompt(&sarah());
        assert!(prompt.starts_with("Patient: Sarah Johnson\n"));
        assert!(prompt.contains("Conditions: Atrial fibrillation\n"));
        assert!(prompt.contains("ECG: ECG observation on file\n"));
        assert!(prompt.contains("Medications: None\n"));
    }

    #[test]
    fn orchestrator_prompt_layout() {
        let prompt = orchestrator_prompt(&sarah(), "AFib", "LA 4.5cm", "Normal");
        assert_eq!(
            prompt,
            "Patient: Sarah Johnson (ID: 6df562fc)\n\nCARDIOLOGY: AFib\nRADIOLOGY: LA 4.5cm\nENDOCRINOLOGY: Normal\n\nGenerate comprehensive report."
        );
    }

    #[test]
    fn question_prompt_layout() {
        let prompt = question_prompt("CTX", "What now?");
        assert_eq!(
            prompt,
            "CTX\n\nUSER QUESTION: What now?\n\nRespond in JSON format with: answer, ui_type, data, sources, confidence"
        );
    }
}
