//! FHIR Bundle to `PatientHealthProfile` extraction.
//!
//! The bundle is walked once into raw records ([`extract_records`]), which are
//! then classified into chronic conditions ([`classify_conditions`]) and
//! significant events ([`classify_events`]). Malformed records are skipped and
//! logged, so extraction itself never fails on well-formed JSON.

mod conditions;
mod events;
mod extract;
mod fields;
mod medications;

use chrono::{DateTime, Utc};
use insight_core::{ClinicalConfig, InsightError, PatientHealthProfile};
use serde_json::Value;
use tracing::debug;

pub use conditions::{classify_conditions, is_known_chronic};
pub use events::classify_events;
pub use extract::{
    extract_patient_id, extract_records, RawCondition, RawEncounter, RawProcedure, RawRecords,
    RecordError,
};
pub use medications::consolidate_medications;

/// Build a patient profile from a bundle held as a JSON string.
pub fn extract_profile_str(
    bundle_json: &str,
    config: &ClinicalConfig,
    as_of: DateTime<Utc>,
) -> Result<PatientHealthProfile, InsightError> {
    let value: Value =
        serde_json::from_str(bundle_json).map_err(|err| InsightError::Parse(err.to_string()))?;
    Ok(extract_profile(&value, config, as_of))
}

/// Build a patient profile from a parsed bundle. `as_of` is the extraction time.
pub fn extract_profile(
    bundle: &Value,
    config: &ClinicalConfig,
    as_of: DateTime<Utc>,
) -> PatientHealthProfile {
    let records = extract_records(bundle);

    let conditions = classify_conditions(&records.conditions, as_of, config);
    let events = classify_events(&records.encounters, &records.procedures, config);
    let medications = consolidate_medications(records.medications);

    debug!(
        patient_id = %records.patient_id,
        chronic_conditions = conditions.len(),
        health_events = events.len(),
        medications = medications.len(),
        "profile assembled"
    );

    PatientHealthProfile::new(records.patient_id, conditions, events, medications, as_of)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unparsable_text_is_a_parse_error() {
        let as_of = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let err = extract_profile_str("{ not json", &ClinicalConfig::default(), as_of)
            .unwrap_err();
        assert!(matches!(err, InsightError::Parse(_)));
    }

    #[test]
    fn bundle_without_entries_gives_empty_profile() {
        let as_of = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let profile = extract_profile_str(
            r#"{ "resourceType": "Bundle", "type": "collection" }"#,
            &ClinicalConfig::default(),
            as_of,
        )
        .unwrap();
        assert_eq!(profile, PatientHealthProfile::empty(as_of));
    }
}
