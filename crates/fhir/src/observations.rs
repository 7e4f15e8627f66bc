//! Flatten Observation resources into numeric measurements.

use cardiolake_core::fhir::reference_id;
use cardiolake_core::patient::{Measurement, UNKNOWN};
use serde_json::Value;

/// One [`Measurement`] per `valueQuantity` found on each observation or its
/// components. Observations without a date and quantities without a numeric
/// value are skipped.
pub fn parse_measurements(observations: &[Value]) -> Vec<Measurement> {
    let mut out = Vec::new();
    for obs in observations {
        let Some(date) = observation_date(obs) else {
            continue;
        };
        let patient_id = obs
            .pointer("/subject/reference")
            .and_then(Value::as_str)
            .map(reference_id)
            .unwrap_or_default()
            .to_string();

        let mut push = |code_holder: &Value, quantity: Option<&Value>| {
            if let Some((value, unit)) = quantity.and_then(quantity_value) {
                out.push(Measurement {
                    patient_id: patient_id.clone(),
                    measurement: coding_display(code_holder),
                    value,
                    unit,
                    date: date.to_string(),
                });
            }
        };

        push(obs, obs.get("valueQuantity"));
        if let Some(components) = obs.get("component").and_then(Value::as_array) {
            for component in components {
                push(component, component.get("valueQuantity"));
            }
        }
    }
    out
}

fn observation_date(obs: &Value) -> Option<&str> {
    ["effectiveDateTime", "issued"]
        .iter()
        .filter_map(|field| obs.get(*field).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

fn quantity_value(quantity: &Value) -> Option<(f64, String)> {
    let value = quantity.get("value")?.as_f64()?;
    let unit = quantity
        .get("unit")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    Some((value, unit))
}

/// Display of the first coding, falling back to `code.text`.
fn coding_display(holder: &Value) -> String {
    holder
        .pointer("/code/coding/0/display")
        .and_then(Value::as_str)
        .or_else(|| holder.pointer("/code/text").and_then(Value::as_str))
        .unwrap_or(UNKNOWN)
        .to_string()
}
