//! Field accessors shared by the resource handlers.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Human-readable text of a CodeableConcept (or bare Coding).
pub(crate) fn extract_codeable_text(value: &Value) -> Option<String> {
    if let Some(text) = value.get("text").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return Some(text.trim().to_string());
        }
    }

    if let Some(display) = value.get("display").and_then(Value::as_str) {
        if !display.trim().is_empty() {
            return Some(display.trim().to_string());
        }
    }

    if let Some(codings) = value.get("coding").and_then(Value::as_array) {
        for coding in codings {
            if let Some(display) = coding.get("display").and_then(Value::as_str) {
                if !display.trim().is_empty() {
                    return Some(display.trim().to_string());
                }
            }
            if let Some(code) = coding.get("code").and_then(Value::as_str) {
                if !code.trim().is_empty() {
                    return Some(code.trim().to_string());
                }
            }
        }
    }

    None
}

/// First non-empty `coding[].code`, together with its system.
pub(crate) fn extract_coding(value: &Value) -> Option<(String, Option<String>)> {
    if let Some(code) = value.get("code").and_then(Value::as_str) {
        if !code.trim().is_empty() {
            let system = value.get("system").and_then(Value::as_str).map(str::to_string);
            return Some((code.trim().to_string(), system));
        }
    }

    let codings = value.get("coding")?.as_array()?;
    codings.iter().find_map(|coding| {
        let code = coding.get("code").and_then(Value::as_str)?.trim();
        if code.is_empty() {
            return None;
        }
        let system = coding
            .get("system")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some((code.to_string(), system))
    })
}

/// Status carried either as a CodeableConcept (R4) or a bare string (STU3).
pub(crate) fn extract_status_code(value: Option<&Value>) -> Option<String> {
    let value = value?;
    if let Some(text) = value.as_str() {
        let trimmed = text.trim();
        return (!trimmed.is_empty()).then(|| trimmed.to_lowercase());
    }
    if let Some((code, _)) = extract_coding(value) {
        return Some(code.to_lowercase());
    }
    extract_codeable_text(value).map(|text| text.to_lowercase())
}

/// First CodeableConcept of an array field, or the field itself when it is an object.
pub(crate) fn first_concept<'a>(resource: &'a Value, field: &str) -> Option<&'a Value> {
    match resource.get(field)? {
        Value::Array(items) => items.first(),
        obj @ Value::Object(_) => Some(obj),
        _ => None,
    }
}

/// Timestamp from the first field that parses. Periods resolve to their start.
pub(crate) fn extract_datetime(resource: &Value, fields: &[&str]) -> Option<DateTime<Utc>> {
    for field in fields {
        let Some(value) = resource.get(*field) else {
            continue;
        };

        if let Some(text) = value.as_str() {
            if let Some(dt) = parse_datetime(text) {
                return Some(dt);
            }
        }

        if let Some(obj) = value.as_object() {
            if let Some(start) = obj.get("start").and_then(Value::as_str) {
                if let Some(dt) = parse_datetime(start) {
                    return Some(dt);
                }
            }
            if let Some(end) = obj.get("end").and_then(Value::as_str) {
                if let Some(dt) = parse_datetime(end) {
                    return Some(dt);
                }
            }
        }
    }
    None
}

pub(crate) fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    insight_core::parse_timestamp(value).ok()
}

pub(crate) fn resource_id(resource: &Value) -> String {
    resource
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "<no id>".to_string())
}

/// `display` of a Reference, falling back to the reference string itself.
pub(crate) fn reference_display(value: &Value) -> Option<String> {
    if let Some(display) = value.get("display").and_then(Value::as_str) {
        if !display.trim().is_empty() {
            return Some(display.trim().to_string());
        }
    }
    None
}

pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect()
}
