//! MedicationRequest / MedicationStatement extraction and consolidation.

use std::collections::{hash_map::Entry, HashMap};

use insight_core::Medication;
use serde_json::Value;

use crate::extract::RecordError;
use crate::fields::{extract_codeable_text, extract_coding, extract_datetime, reference_display};

pub(crate) fn medication_record(resource: &Value) -> Result<Medication, RecordError> {
    let concept = resource.get("medicationCodeableConcept");
    let code = concept.and_then(extract_coding).map(|(code, _)| code);

    let display = concept
        .and_then(extract_codeable_text)
        .or_else(|| resource.get("medicationReference").and_then(reference_display))
        .or_else(|| code.clone())
        .ok_or(RecordError::MissingField {
            kind: "MedicationRequest",
            field: "medicationCodeableConcept",
        })?;

    let status = resource
        .get("status")
        .and_then(Value::as_str)
        .map(|status| status.trim().to_lowercase())
        .filter(|status| !status.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    Ok(Medication {
        status,
        code,
        display,
        dosage_instructions: summarize_dosage(resource),
        prescribed_date: extract_datetime(
            resource,
            &[
                "authoredOn",
                "dateAsserted",
                "effectiveDateTime",
                "effectivePeriod",
            ],
        ),
    })
}

/// One entry per medication (by code, else display), keeping the latest prescription.
pub fn consolidate_medications(medications: Vec<Medication>) -> Vec<Medication> {
    let mut latest: HashMap<String, Medication> = HashMap::new();

    for medication in medications {
        let key = medication
            .code
            .clone()
            .unwrap_or_else(|| medication.display.to_lowercase());
        match latest.entry(key) {
            Entry::Occupied(mut entry) => {
                if medication.prescribed_date >= entry.get().prescribed_date {
                    entry.insert(medication);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(medication);
            }
        }
    }

    let mut consolidated: Vec<Medication> = latest.into_values().collect();
    consolidated.sort_by(|a, b| {
        b.prescribed_date
            .cmp(&a.prescribed_date)
            .then_with(|| a.display.cmp(&b.display))
    });
    consolidated
}

fn summarize_dosage(resource: &Value) -> Option<String> {
    let dosage = resource
        .get("dosageInstruction")
        .or_else(|| resource.get("dosage"))?
        .as_array()?
        .first()?;

    if let Some(text) = dosage.get("text").and_then(Value::as_str) {
        let cleaned = text.trim();
        if !cleaned.is_empty() {
            return Some(cleaned.to_string());
        }
    }

    let mut phrases = Vec::new();

    if let Some(dose) = dosage
        .get("doseAndRate")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|entry| entry.get("doseQuantity"))
        .and_then(format_quantity_value)
    {
        phrases.push(dose);
    }

    if let Some(repeat) = dosage.get("timing").and_then(|timing| timing.get("repeat")) {
        let frequency = repeat.get("frequency").and_then(Value::as_f64);
        let period = repeat.get("period").and_then(Value::as_f64);
        let unit = repeat.get("periodUnit").and_then(Value::as_str);
        if let (Some(frequency), Some(period), Some(unit)) = (frequency, period, unit) {
            phrases.push(format!(
                "{} time(s) every {} {}",
                format_numeric(frequency),
                format_numeric(period),
                period_unit_label(unit)
            ));
        }
    }

    if dosage.get("asNeededBoolean").and_then(Value::as_bool) == Some(true) {
        phrases.push("as needed".to_string());
    }

    if phrases.is_empty() {
        None
    } else {
        Some(phrases.join(", "))
    }
}

fn period_unit_label(unit: &str) -> &str {
    match unit {
        "s" => "second(s)",
        "min" => "minute(s)",
        "h" => "hour(s)",
        "d" => "day(s)",
        "wk" => "week(s)",
        "mo" => "month(s)",
        "a" => "year(s)",
        other => other,
    }
}

fn format_quantity_value(value: &Value) -> Option<String> {
    let magnitude = value.get("value")?.as_f64()?;
    let unit = value.get("unit").and_then(Value::as_str).unwrap_or("");
    let number = format_numeric(magnitude);
    if unit.is_empty() {
        Some(number)
    } else {
        Some(format!("{number} {unit}"))
    }
}

fn format_numeric(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}
