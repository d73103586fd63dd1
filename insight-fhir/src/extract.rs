//! Walks a FHIR Bundle and yields typed raw records per resource kind.

use chrono::{DateTime, Utc};
use insight_core::{Medication, UNKNOWN_PATIENT_ID};
use serde_json::Value;
use tracing::{debug, warn};

use crate::fields::{
    extract_codeable_text, extract_coding, extract_datetime, extract_status_code, first_concept,
    reference_display, resource_id,
};
use crate::medications::medication_record;

/// Raw records grouped by kind, in bundle order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecords {
    pub patient_id: String,
    pub conditions: Vec<RawCondition>,
    pub encounters: Vec<RawEncounter>,
    pub procedures: Vec<RawProcedure>,
    pub medications: Vec<Medication>,
}

impl RawRecords {
    fn new(patient_id: String) -> Self {
        Self {
            patient_id,
            conditions: Vec::new(),
            encounters: Vec::new(),
            procedures: Vec::new(),
            medications: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawCondition {
    pub id: String,
    pub code: String,
    pub code_system: Option<String>,
    pub description: String,
    pub clinical_status: Option<String>,
    pub verification_status: Option<String>,
    pub onset: Option<DateTime<Utc>>,
    pub recorded: Option<DateTime<Utc>>,
    pub severity: Option<String>,
}

impl RawCondition {
    /// Timestamp used to pick the most recent record among duplicates.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        self.recorded.or(self.onset)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawEncounter {
    pub id: String,
    pub code: Option<String>,
    pub description: String,
    pub class_code: Option<String>,
    pub type_text: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawProcedure {
    pub id: String,
    pub code: Option<String>,
    pub description: String,
    pub status: Option<String>,
    pub category_code: Option<String>,
    pub category_text: Option<String>,
    pub performed: Option<DateTime<Utc>>,
    pub provider: Option<String>,
}

/// Why a single resource was left out of the extraction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("{kind} is missing required field `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
    #[error("{kind} has an unsupported `{field}` shape")]
    UnsupportedShape {
        kind: &'static str,
        field: &'static str,
    },
}

/// Extract raw records from a Bundle. Never fails: bad records are skipped and logged.
pub fn extract_records(bundle: &Value) -> RawRecords {
    let Some(entries) = bundle_entries(bundle) else {
        return RawRecords::new(UNKNOWN_PATIENT_ID.to_string());
    };

    let mut records = RawRecords::new(extract_patient_id(entries));

    for (position, entry) in entries.iter().enumerate() {
        let Some(resource) = entry.get("resource") else {
            warn!(position, "bundle entry has no resource, skipping");
            continue;
        };

        let kind = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let outcome = match kind {
            "Condition" => condition_record(resource).map(|r| records.conditions.push(r)),
            "Encounter" => encounter_record(resource).map(|r| records.encounters.push(r)),
            "Procedure" => procedure_record(resource).map(|r| records.procedures.push(r)),
            "MedicationRequest" | "MedicationStatement" => {
                medication_record(resource).map(|r| records.medications.push(r))
            }
            _ => Ok(()),
        };

        if let Err(err) = outcome {
            warn!(
                resource_type = kind,
                resource_id = %resource_id(resource),
                error = %err,
                "skipping malformed record"
            );
        }
    }

    debug!(
        patient_id = %records.patient_id,
        conditions = records.conditions.len(),
        encounters = records.encounters.len(),
        procedures = records.procedures.len(),
        medications = records.medications.len(),
        "extracted raw records"
    );

    records
}

fn bundle_entries(bundle: &Value) -> Option<&Vec<Value>> {
    match bundle.get("resourceType").and_then(Value::as_str) {
        Some("Bundle") => {}
        Some(other) => {
            warn!(resource_type = other, "expected a Bundle, treating input as empty");
            return None;
        }
        None => {
            warn!("input has no resourceType, treating input as empty");
            return None;
        }
    }

    let entries = bundle.get("entry").and_then(Value::as_array);
    if entries.is_none() {
        debug!("bundle has no entries");
    }
    entries
}

/// Patient identifier: first Patient's `id`, then its `fullUrl`, then the
/// first entry's `fullUrl` whatever its kind, else "Unknown".
pub fn extract_patient_id(entries: &[Value]) -> String {
    let patient_entry = entries.iter().find(|entry| {
        entry
            .get("resource")
            .and_then(|resource| resource.get("resourceType"))
            .and_then(Value::as_str)
            == Some("Patient")
    });

    let from_resource = patient_entry
        .and_then(|entry| entry.get("resource"))
        .and_then(|resource| resource.get("id"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty());

    from_resource
        .or_else(|| patient_entry.and_then(full_url_id))
        .or_else(|| entries.first().and_then(full_url_id))
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_PATIENT_ID.to_string())
}

fn full_url_id(entry: &Value) -> Option<&str> {
    entry
        .get("fullUrl")
        .and_then(Value::as_str)
        .map(|url| url.trim_start_matches("urn:uuid:").trim())
        .filter(|id| !id.is_empty())
}

fn condition_record(resource: &Value) -> Result<RawCondition, RecordError> {
    let concept = resource.get("code").ok_or(RecordError::MissingField {
        kind: "Condition",
        field: "code",
    })?;
    let (code, code_system) = extract_coding(concept).ok_or(RecordError::MissingField {
        kind: "Condition",
        field: "code.coding",
    })?;
    let description = extract_codeable_text(concept).unwrap_or_else(|| code.clone());

    Ok(RawCondition {
        id: resource_id(resource),
        code,
        code_system,
        description,
        clinical_status: extract_status_code(resource.get("clinicalStatus")),
        verification_status: extract_status_code(resource.get("verificationStatus")),
        onset: extract_datetime(resource, &["onsetDateTime", "onsetPeriod", "onsetDate"]),
        recorded: extract_datetime(resource, &["recordedDate", "assertedDate"]),
        severity: resource.get("severity").and_then(extract_codeable_text),
    })
}

fn encounter_record(resource: &Value) -> Result<RawEncounter, RecordError> {
    let class = match resource.get("class") {
        Some(Value::String(_)) => {
            return Err(RecordError::UnsupportedShape {
                kind: "Encounter",
                field: "class",
            })
        }
        _ => first_concept(resource, "class"),
    };
    let class_code = class.and_then(extract_coding).map(|(code, _)| code);
    let kind = first_concept(resource, "type");
    let type_text = kind.and_then(extract_codeable_text);

    if class_code.is_none() && type_text.is_none() {
        return Err(RecordError::MissingField {
            kind: "Encounter",
            field: "class",
        });
    }

    let description = type_text
        .clone()
        .or_else(|| class.and_then(extract_codeable_text))
        .unwrap_or_else(|| "Encounter".to_string());

    let provider = resource
        .get("serviceProvider")
        .and_then(reference_display)
        .or_else(|| {
            resource
                .get("participant")
                .and_then(Value::as_array)
                .and_then(|arr| arr.first())
                .and_then(|participant| {
                    participant
                        .get("individual")
                        .or_else(|| participant.get("actor"))
                })
                .and_then(reference_display)
        });

    Ok(RawEncounter {
        id: resource_id(resource),
        code: kind.and_then(extract_coding).map(|(code, _)| code),
        description,
        class_code,
        type_text,
        start: extract_datetime(resource, &["period", "actualPeriod"]),
        provider,
    })
}

fn procedure_record(resource: &Value) -> Result<RawProcedure, RecordError> {
    let concept = resource.get("code").ok_or(RecordError::MissingField {
        kind: "Procedure",
        field: "code",
    })?;
    let code = extract_coding(concept).map(|(code, _)| code);
    let description = extract_codeable_text(concept).ok_or(RecordError::MissingField {
        kind: "Procedure",
        field: "code.text",
    })?;

    let category = first_concept(resource, "category");

    let provider = resource
        .get("performer")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|performer| performer.get("actor"))
        .and_then(reference_display)
        .or_else(|| resource.get("location").and_then(reference_display));

    Ok(RawProcedure {
        id: resource_id(resource),
        code,
        description,
        status: extract_status_code(resource.get("status")),
        category_code: category.and_then(extract_coding).map(|(code, _)| code),
        category_text: category.and_then(extract_codeable_text),
        performed: extract_datetime(
            resource,
            &["performedDateTime", "performedPeriod", "occurrenceDateTime"],
        ),
        provider,
    })
}
