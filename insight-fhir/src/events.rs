//! Significant health event classification from encounters and procedures.

use std::collections::HashSet;

use insight_core::{ClinicalConfig, HealthEvent, HealthEventType};
use tracing::debug;

use crate::extract::{RawEncounter, RawProcedure};
use crate::fields::tokenize;

/// Significant events, ascending by date, without duplicate (code, date) pairs.
pub fn classify_events(
    encounters: &[RawEncounter],
    procedures: &[RawProcedure],
    config: &ClinicalConfig,
) -> Vec<HealthEvent> {
    let mut events: Vec<HealthEvent> = encounters
        .iter()
        .filter_map(|encounter| encounter_event(encounter, config))
        .chain(procedures.iter().filter_map(procedure_event))
        .collect();

    events.sort_by_key(|event| event.date);

    let mut seen = HashSet::new();
    events.retain(|event| seen.insert(event.dedup_key()));
    events
}

fn encounter_event(encounter: &RawEncounter, config: &ClinicalConfig) -> Option<HealthEvent> {
    let event_type = match encounter_class(encounter) {
        Some(kind) => kind,
        None if config.include_consultations && is_consultation(encounter) => {
            HealthEventType::Consultation
        }
        None => return None,
    };

    let Some(date) = encounter.start else {
        debug!(id = %encounter.id, "significant encounter without a date, excluded");
        return None;
    };

    Some(HealthEvent {
        event_type,
        description: encounter.description.clone(),
        date,
        code: encounter.code.clone(),
        provider: encounter.provider.clone(),
    })
}

fn encounter_class(encounter: &RawEncounter) -> Option<HealthEventType> {
    let class = encounter.class_code.as_deref()?.trim().to_lowercase();
    match class.as_str() {
        "emer" | "emergency" => Some(HealthEventType::EmergencyVisit),
        "imp" | "acute" | "nonac" | "inpatient" => Some(HealthEventType::Hospitalization),
        _ => None,
    }
}

fn is_consultation(encounter: &RawEncounter) -> bool {
    let Some(text) = encounter.type_text.as_deref() else {
        return false;
    };
    tokenize(text)
        .iter()
        .any(|token| CONSULTATION_KEYWORDS.contains(&token.as_str()))
}

fn procedure_event(procedure: &RawProcedure) -> Option<HealthEvent> {
    if matches!(
        procedure.status.as_deref(),
        Some("not-done") | Some("entered-in-error")
    ) {
        return None;
    }

    match procedure_significance(procedure) {
        Significance::Major => {}
        Significance::Routine => return None,
        Significance::Ambiguous => {
            debug!(
                id = %procedure.id,
                description = %procedure.description,
                "procedure significance ambiguous, excluded"
            );
            return None;
        }
    }

    let Some(date) = procedure.performed else {
        debug!(id = %procedure.id, "major procedure without a date, excluded");
        return None;
    };

    Some(HealthEvent {
        event_type: HealthEventType::Procedure,
        description: procedure.description.clone(),
        date,
        code: procedure.code.clone(),
        provider: procedure.provider.clone(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Significance {
    Major,
    Routine,
    Ambiguous,
}

fn procedure_significance(procedure: &RawProcedure) -> Significance {
    if let Some(code) = procedure.category_code.as_deref() {
        if code == SURGICAL_CATEGORY {
            return Significance::Major;
        }
        if ROUTINE_CATEGORIES.contains(&code) {
            return Significance::Routine;
        }
    }

    if let Some(text) = procedure.category_text.as_deref() {
        let tokens = tokenize(text);
        if tokens.iter().any(|t| t.starts_with("surg")) {
            return Significance::Major;
        }
        if tokens.iter().any(|t| ROUTINE_KEYWORDS.contains(&t.as_str())) {
            return Significance::Routine;
        }
    }

    let tokens = tokenize(&procedure.description);
    let major = tokens
        .iter()
        .any(|token| MAJOR_STEMS.iter().any(|stem| token.contains(stem)));
    let routine = tokens
        .iter()
        .any(|token| ROUTINE_KEYWORDS.contains(&token.as_str()));

    match (major, routine) {
        (true, false) => Significance::Major,
        (false, true) => Significance::Routine,
        _ => Significance::Ambiguous,
    }
}

/// SNOMED CT "Surgical procedure".
const SURGICAL_CATEGORY: &str = "387713003";

/// Diagnostic, counseling, education, social service, chiropractic.
const ROUTINE_CATEGORIES: [&str; 5] = ["103693007", "409063005", "409073007", "410606002", "46947000"];

const MAJOR_STEMS: [&str; 20] = [
    "surg",
    "ectomy",
    "otomy",
    "ostomy",
    "plasty",
    "transplant",
    "bypass",
    "replacement",
    "resection",
    "amputation",
    "catheterization",
    "implantation",
    "excision",
    "fixation",
    "graft",
    "arthroscop",
    "laparoscop",
    "cesarean",
    "intervention",
    "thrombectomy",
];

const ROUTINE_KEYWORDS: [&str; 18] = [
    "screening",
    "assessment",
    "vaccination",
    "immunization",
    "education",
    "counseling",
    "counselling",
    "examination",
    "evaluation",
    "review",
    "reconciliation",
    "measurement",
    "check",
    "referral",
    "preventive",
    "routine",
    "diagnostic",
    "administration",
];

const CONSULTATION_KEYWORDS: [&str; 4] = ["consultation", "consult", "specialist", "referral"];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 8, d, 12, 0, 0).unwrap()
    }

    fn encounter(id: &str, class: &str, type_text: &str, date: Option<DateTime<Utc>>) -> RawEncounter {
        RawEncounter {
            id: id.to_string(),
            code: Some(format!("code-{id}")),
            description: type_text.to_string(),
            class_code: Some(class.to_string()),
            type_text: Some(type_text.to_string()),
            start: date,
            provider: Some("General Hospital".to_string()),
        }
    }

    fn procedure(id: &str, description: &str, date: Option<DateTime<Utc>>) -> RawProcedure {
        RawProcedure {
            id: id.to_string(),
            code: Some(format!("code-{id}")),
            description: description.to_string(),
            status: Some("completed".to_string()),
            category_code: None,
            category_text: None,
            performed: date,
            provider: None,
        }
    }

    #[test]
    fn emergency_and_inpatient_encounters_qualify() {
        let encounters = vec![
            encounter("e1", "EMER", "Emergency room admission", Some(day(5))),
            encounter("e2", "IMP", "Hospital admission", Some(day(2))),
            encounter("e3", "AMB", "General examination of patient", Some(day(3))),
        ];

        let events = classify_events(&encounters, &[], &ClinicalConfig::default());
        let kinds: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            kinds,
            vec![HealthEventType::Hospitalization, HealthEventType::EmergencyVisit]
        );
    }

    #[test]
    fn consultations_follow_config() {
        let encounters = vec![encounter(
            "c1",
            "AMB",
            "Consultation for treatment",
            Some(day(9)),
        )];

        let events = classify_events(&encounters, &[], &ClinicalConfig::default());
        assert_eq!(events[0].event_type, HealthEventType::Consultation);

        let config = ClinicalConfig {
            include_consultations: false,
            ..ClinicalConfig::default()
        };
        assert!(classify_events(&encounters, &[], &config).is_empty());
    }

    #[test]
    fn major_procedures_qualify_routine_do_not() {
        let procedures = vec![
            procedure("p1", "Appendectomy", Some(day(4))),
            procedure("p2", "Depression screening (procedure)", Some(day(4))),
            procedure("p3", "Hemodialysis (procedure)", Some(day(6))),
            procedure("p4", "Total replacement of knee joint", Some(day(1))),
        ];

        let events = classify_events(&[], &procedures, &ClinicalConfig::default());
        let descriptions: Vec<_> = events.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, vec!["Total replacement of knee joint", "Appendectomy"]);
    }

    #[test]
    fn category_overrides_keywords() {
        let mut surgical = procedure("p1", "Removal of device", Some(day(2)));
        surgical.category_code = Some(SURGICAL_CATEGORY.to_string());
        let mut counseling = procedure("p2", "Bypass counseling session", Some(day(2)));
        counseling.category_text = Some("Counseling".to_string());

        let events = classify_events(&[], &[surgical, counseling], &ClinicalConfig::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].description, "Removal of device");
    }

    #[test]
    fn undated_and_not_done_records_are_excluded() {
        let mut skipped = procedure("p1", "Appendectomy", Some(day(3)));
        skipped.status = Some("not-done".to_string());
        let undated = procedure("p2", "Appendectomy", None);
        let no_date_encounter = encounter("e1", "EMER", "Emergency room admission", None);

        let events =
            classify_events(&[no_date_encounter], &[skipped, undated], &ClinicalConfig::default());
        assert!(events.is_empty());
    }

    #[test]
    fn duplicates_collapse_and_order_is_chronological() {
        let encounters = vec![
            encounter("e1", "EMER", "Emergency room admission", Some(day(10))),
            encounter("e1", "EMER", "Emergency room admission", Some(day(10))),
            encounter("e2", "EMER", "Emergency room admission", Some(day(1))),
        ];
        let procedures = vec![
            procedure("p1", "Appendectomy", Some(day(7))),
            procedure("p1", "Appendectomy", Some(day(7))),
        ];

        let events = classify_events(&encounters, &procedures, &ClinicalConfig::default());
        assert_eq!(events.len(), 3);
        assert!(events.windows(2).all(|pair| pair[0].date <= pair[1].date));

        let keys: HashSet<_> = events.iter().map(HealthEvent::dedup_key).collect();
        assert_eq!(keys.len(), events.len());
    }
}
