use std::fs;

use chrono::{TimeZone, Utc};
use insight_core::ClinicalConfig;
use insight_fhir::extract_profile_str;
use serde_json::Value;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn synthea_bundle_matches_golden_profile() {
    let bundle = fs::read_to_string(fixture_path("synthea_bundle.json"))
        .expect("Không đọc được bundle mẫu");

    let as_of = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let profile = extract_profile_str(&bundle, &ClinicalConfig::default(), as_of)
        .expect("Không tạo được hồ sơ");

    let actual = serde_json::to_value(&profile).expect("Không serialize hồ sơ");

    let expected = fs::read_to_string(fixture_path("expected_profile.json"))
        .expect("Không đọc được golden profile");
    let expected_value: Value = serde_json::from_str(&expected).expect("Golden không hợp lệ");

    assert_eq!(actual, expected_value);
}

#[test]
fn extraction_is_repeatable() {
    let bundle = fs::read_to_string(fixture_path("synthea_bundle.json"))
        .expect("Không đọc được bundle mẫu");
    let as_of = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let config = ClinicalConfig::default();

    let first = extract_profile_str(&bundle, &config, as_of).unwrap();
    let second = extract_profile_str(&bundle, &config, as_of).unwrap();
    assert_eq!(first, second);
}
