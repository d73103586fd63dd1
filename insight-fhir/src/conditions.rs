//! Chronic condition classification.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use insight_core::{ChronicCondition, ClinicalConfig, ConditionStatus};
use tracing::{debug, warn};

use crate::extract::RawCondition;

/// Reduce raw Condition records to active, long-term conditions, one per code.
pub fn classify_conditions(
    records: &[RawCondition],
    as_of: DateTime<Utc>,
    config: &ClinicalConfig,
) -> Vec<ChronicCondition> {
    let mut latest: HashMap<&str, &RawCondition> = HashMap::new();
    for record in records {
        latest
            .entry(record.code.as_str())
            .and_modify(|existing| {
                if record.recorded_at() >= existing.recorded_at() {
                    *existing = record;
                }
            })
            .or_insert(record);
    }

    let mut conditions: Vec<ChronicCondition> = latest
        .into_values()
        .filter_map(|record| qualify(record, as_of, config))
        .collect();

    conditions.sort_by(|a, b| {
        (a.onset_date.is_none(), a.onset_date, &a.code).cmp(&(
            b.onset_date.is_none(),
            b.onset_date,
            &b.code,
        ))
    });
    conditions
}

fn qualify(
    record: &RawCondition,
    as_of: DateTime<Utc>,
    config: &ClinicalConfig,
) -> Option<ChronicCondition> {
    if matches!(
        record.verification_status.as_deref(),
        Some("entered-in-error") | Some("refuted")
    ) {
        debug!(id = %record.id, code = %record.code, "condition not verified, excluded");
        return None;
    }

    let Some(clinical_status) = record.clinical_status.as_deref() else {
        debug!(id = %record.id, code = %record.code, "condition without clinicalStatus, excluded");
        return None;
    };

    let status = ConditionStatus::from_clinical_code(clinical_status);
    if status != ConditionStatus::Active {
        return None;
    }

    let onset_date = match record.onset {
        Some(onset) if onset > as_of => {
            warn!(
                id = %record.id,
                onset = %onset,
                "condition onset is after extraction time, discarding onset"
            );
            None
        }
        other => other,
    };

    let known = is_known_chronic(record, config);
    if !known && config.exclude_non_disorder_findings && has_non_disorder_tag(&record.description) {
        debug!(
            id = %record.id,
            description = %record.description,
            "finding/situation outside the chronic code set, excluded"
        );
        return None;
    }

    let long_standing = onset_date
        .map(|onset| as_of - onset > Duration::days(i64::from(config.chronic_onset_days)))
        .unwrap_or(false);

    if !(known || long_standing) {
        return None;
    }

    Some(ChronicCondition {
        code: record.code.clone(),
        description: record.description.clone(),
        onset_date,
        severity: record.severity.clone(),
        status,
    })
}

/// Whether the code belongs to the chronic code set (SNOMED CT, ICD-10 prefixes, extras).
pub fn is_known_chronic(record: &RawCondition, config: &ClinicalConfig) -> bool {
    let code = record.code.trim();
    if CHRONIC_SNOMED_CODES.contains(&code)
        || config
            .extra_chronic_codes
            .iter()
            .any(|extra| extra.trim().eq_ignore_ascii_case(code))
    {
        return true;
    }

    let is_icd10 = match record.code_system.as_deref() {
        Some(system) => {
            let system = system.to_lowercase();
            system.contains("icd-10") || system.contains("icd10")
        }
        None => looks_like_icd10(code),
    };

    if !is_icd10 {
        return false;
    }

    let normalized = code.replace('.', "").to_uppercase();
    CHRONIC_ICD10_PREFIXES
        .iter()
        .any(|prefix| normalized.starts_with(prefix))
}

fn looks_like_icd10(code: &str) -> bool {
    let mut chars = code.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(letter), Some(d1), Some(d2))
            if letter.is_ascii_alphabetic() && d1.is_ascii_digit() && d2.is_ascii_digit()
    )
}

/// SNOMED semantic tag such as "Stress (finding)".
fn has_non_disorder_tag(description: &str) -> bool {
    let trimmed = description.trim_end();
    let Some(inner) = trimmed.strip_suffix(')') else {
        return false;
    };
    let Some(open) = inner.rfind('(') else {
        return false;
    };
    matches!(
        inner[open + 1..].trim().to_lowercase().as_str(),
        "finding" | "situation"
    )
}

const CHRONIC_SNOMED_CODES: [&str; 48] = [
    "44054006",         // Diabetes mellitus type 2
    "46635009",         // Diabetes mellitus type 1
    "73211009",         // Diabetes mellitus
    "15777000",         // Prediabetes
    "127013003",        // Diabetic renal disease
    "90781000119102",   // Microalbuminuria due to type 2 diabetes
    "368581000119106",  // Neuropathy due to type 2 diabetes
    "1551000119108",    // Nonproliferative retinopathy due to type 2 diabetes
    "38341003",         // Hypertension
    "59621000",         // Essential hypertension
    "55822004",         // Hyperlipidemia
    "302870006",        // Hypertriglyceridemia
    "53741008",         // Coronary arteriosclerosis
    "414545008",        // Ischemic heart disease
    "49436004",         // Atrial fibrillation
    "84114007",         // Heart failure
    "88805009",         // Chronic congestive heart failure
    "399211009",        // History of myocardial infarction
    "195967001",        // Asthma
    "233678006",        // Childhood asthma
    "13645005",         // Chronic obstructive lung disease
    "185086009",        // Chronic obstructive bronchitis
    "87433001",         // Pulmonary emphysema
    "40055000",         // Chronic sinusitis
    "431855005",        // Chronic kidney disease stage 1
    "431856006",        // Chronic kidney disease stage 2
    "433144002",        // Chronic kidney disease stage 3
    "431857002",        // Chronic kidney disease stage 4
    "46177005",         // End-stage renal disease
    "162864005",        // Body mass index 30+ - obesity
    "408512008",        // Body mass index 40+ - severely obese
    "69896004",         // Rheumatoid arthritis
    "239873007",        // Osteoarthritis of knee
    "239872002",        // Osteoarthritis of hip
    "64859006",         // Osteoporosis
    "90560007",         // Gout
    "26929004",         // Alzheimer's disease
    "49049000",         // Parkinson's disease
    "24700007",         // Multiple sclerosis
    "84757009",         // Epilepsy
    "35489007",         // Depressive disorder
    "370143000",        // Major depressive disorder
    "197480006",        // Anxiety disorder
    "86406008",         // HIV infection
    "235595009",        // Gastroesophageal reflux disease
    "82423001",         // Chronic pain
    "40930008",         // Hypothyroidism
    "34486009",         // Hyperthyroidism
];

const CHRONIC_ICD10_PREFIXES: [&str; 24] = [
    "E10", "E11", "E03", "E05", "E66", "E78", "I10", "I11", "I25", "I48", "I50", "J44", "J45",
    "N18", "M05", "M06", "M17", "M81", "G20", "G30", "G35", "G40", "F32", "B20",
];
