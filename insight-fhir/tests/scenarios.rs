use std::collections::HashSet;

use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use insight_core::{ClinicalConfig, HealthEventType};
use insight_fhir::{classify_conditions, classify_events, extract_profile, extract_records};
use serde_json::{json, Value};

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn stamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn condition(id: &str, code: &str, display: &str, onset: DateTime<Utc>) -> Value {
    json!({
        "resource": {
            "resourceType": "Condition",
            "id": id,
            "clinicalStatus": { "coding": [{ "code": "active" }] },
            "code": { "coding": [{ "system": "http://snomed.info/sct", "code": code, "display": display }] },
            "onsetDateTime": stamp(onset)
        }
    })
}

fn bundle(entries: Vec<Value>) -> Value {
    json!({ "resourceType": "Bundle", "type": "collection", "entry": entries })
}

#[test]
fn empty_bundle_yields_unknown_patient() {
    let profile = extract_profile(&bundle(Vec::new()), &ClinicalConfig::default(), as_of());
    assert_eq!(profile.patient_id, "Unknown");
    assert!(profile.chronic_conditions.is_empty());
    assert!(profile.health_events.is_empty());
    assert!(profile.medications.is_empty());
    assert_eq!(profile.last_updated, as_of());
}

#[test]
fn onset_age_decides_unknown_codes() {
    let entries = vec![
        condition("old", "44054006", "Diabetes mellitus type 2 (disorder)", as_of() - Duration::days(400)),
        condition("new", "444814009", "Viral sinusitis (disorder)", as_of() - Duration::days(10)),
    ];

    let records = extract_records(&bundle(entries));
    let conditions = classify_conditions(&records.conditions, as_of(), &ClinicalConfig::default());

    let codes: Vec<_> = conditions.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["44054006"]);
}

#[test]
fn classification_is_idempotent() {
    let entries = vec![
        condition("a", "38341003", "Hypertension", as_of() - Duration::days(900)),
        condition("b", "38341003", "Hypertension", as_of() - Duration::days(900)),
        condition("c", "278860009", "Chronic low back pain (disorder)", as_of() - Duration::days(300)),
    ];
    let records = extract_records(&bundle(entries));
    let config = ClinicalConfig::default();

    let first = classify_conditions(&records.conditions, as_of(), &config);
    let second = classify_conditions(&records.conditions, as_of(), &config);
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn events_are_ordered_and_unique() {
    let encounter = |id: &str, class: &str, start: &str| {
        json!({
            "resource": {
                "resourceType": "Encounter",
                "id": id,
                "class": { "code": class },
                "type": [{ "coding": [{ "code": format!("type-{class}"), "display": "Admission" }] }],
                "period": { "start": start }
            }
        })
    };
    let entries = vec![
        encounter("e1", "EMER", "2023-09-01T08:00:00Z"),
        encounter("e2", "IMP", "2021-01-15T08:00:00Z"),
        encounter("e3", "EMER", "2023-09-01T08:00:00Z"),
        encounter("e4", "EMER", "2022-04-30T21:10:00Z"),
        json!({
            "resource": {
                "resourceType": "Procedure",
                "id": "p1",
                "status": "completed",
                "code": { "coding": [{ "code": "73761001", "display": "Colonoscopy" }] },
                "category": { "coding": [{ "code": "387713003", "display": "Surgical procedure" }] },
                "performedDateTime": "2022-04-30T09:00:00Z"
            }
        }),
    ];

    let records = extract_records(&bundle(entries));
    let events = classify_events(&records.encounters, &records.procedures, &ClinicalConfig::default());

    assert_eq!(events.len(), 4);
    assert!(events.windows(2).all(|pair| pair[0].date <= pair[1].date));
    let keys: HashSet<_> = events.iter().map(|e| e.dedup_key()).collect();
    assert_eq!(keys.len(), events.len());
    assert_eq!(events[0].event_type, HealthEventType::Hospitalization);
    assert_eq!(events[1].event_type, HealthEventType::Procedure);
}

#[test]
fn non_bundle_input_is_tolerated() {
    let profile = extract_profile(
        &json!({ "resourceType": "Patient", "id": "lonely" }),
        &ClinicalConfig::default(),
        as_of(),
    );
    assert_eq!(profile.patient_id, "Unknown");
    assert!(profile.timeline().is_empty());
}

#[test]
fn future_onset_is_discarded_not_the_condition() {
    let entries = vec![condition(
        "future",
        "38341003",
        "Hypertension",
        as_of() + Duration::days(30),
    )];
    let profile = extract_profile(&bundle(entries), &ClinicalConfig::default(), as_of());
    assert_eq!(profile.chronic_conditions.len(), 1);
    assert_eq!(profile.chronic_conditions[0].onset_date, None);
}
