//! Bridge WASM <-> JavaScript trung lập framework.

use chrono::{DateTime, Utc};
use insight_core::{parse_timestamp, DateRange, HeartRateSeries, InsightConfig, Sample};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

/// Cấu hình một phần từ JS; trường nào thiếu giữ giá trị mặc định.
#[derive(Debug, Default, Deserialize)]
struct JsInsightConfig {
    #[serde(default)]
    chronic_onset_days: Option<u32>,
    #[serde(default)]
    include_consultations: Option<bool>,
    #[serde(default)]
    extra_chronic_codes: Option<Vec<String>>,
    #[serde(default)]
    min_trend_samples: Option<usize>,
    #[serde(default)]
    stability_band_pct: Option<f64>,
    #[serde(default)]
    anomaly_sigma: Option<f64>,
    #[serde(default)]
    hypo_threshold: Option<f64>,
    #[serde(default)]
    hyper_threshold: Option<f64>,
    #[serde(default)]
    local_offset_minutes: Option<i32>,
}

impl From<JsInsightConfig> for InsightConfig {
    fn from(cfg: JsInsightConfig) -> Self {
        let mut base = InsightConfig::default();
        if let Some(days) = cfg.chronic_onset_days {
            base.clinical.chronic_onset_days = days;
        }
        if let Some(include) = cfg.include_consultations {
            base.clinical.include_consultations = include;
        }
        if let Some(codes) = cfg.extra_chronic_codes {
            base.clinical.extra_chronic_codes = codes;
        }
        if let Some(samples) = cfg.min_trend_samples {
            base.analysis.min_trend_samples = samples;
        }
        if let Some(band) = cfg.stability_band_pct {
            base.analysis.stability_band_pct = band;
        }
        if let Some(sigma) = cfg.anomaly_sigma {
            base.analysis.anomaly_sigma = sigma;
        }
        if let Some(low) = cfg.hypo_threshold {
            base.analysis.hypo_threshold = low;
        }
        if let Some(high) = cfg.hyper_threshold {
            base.analysis.hyper_threshold = high;
        }
        if let Some(offset) = cfg.local_offset_minutes {
            base.analysis.local_offset_minutes = offset;
        }
        base
    }
}

/// Trích xuất hồ sơ bệnh nhân từ một FHIR Bundle.
#[wasm_bindgen]
pub fn extract_profile(
    input_bundle: JsValue,
    config: Option<JsValue>,
    as_of: Option<String>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let bundle_value = from_value::<serde_json::Value>(input_bundle)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được JSON bundle: {err}")))?;
    let cfg = read_config(config)?;
    let as_of = match as_of {
        Some(text) => parse_instant(&text)?,
        None => Utc::now(),
    };

    let profile = insight_fhir::extract_profile(&bundle_value, &cfg.clinical, as_of);
    serialize(&profile, "hồ sơ")
}

/// Phân tích nhịp tim trong khoảng `[start, end]`; trả `null` khi không có dữ liệu.
#[wasm_bindgen]
pub fn analyze_heart_rate(
    series: JsValue,
    start: String,
    end: String,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let series: HeartRateSeries = from_value(series)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được chuỗi nhịp tim: {err}")))?;
    let range = read_range(&start, &end)?;
    let cfg = read_config(config)?;

    let analysis = insight_wearables::analyze_heart_rate(&series, &range, &cfg.analysis);
    serialize(&analysis, "phân tích nhịp tim")
}

/// Phân tích đường huyết trong khoảng `[start, end]`; trả `null` khi không có dữ liệu.
#[wasm_bindgen]
pub fn analyze_glucose(
    samples: JsValue,
    start: String,
    end: String,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let samples: Vec<Sample> = from_value(samples)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được mẫu đường huyết: {err}")))?;
    let range = read_range(&start, &end)?;
    let cfg = read_config(config)?;

    let analysis = insight_wearables::analyze_glucose(&samples, &range, &cfg.analysis);
    serialize(&analysis, "phân tích đường huyết")
}

fn read_config(config: Option<JsValue>) -> Result<InsightConfig, JsValue> {
    match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsInsightConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            Ok(InsightConfig::from(cfg))
        }
        _ => Ok(InsightConfig::default()),
    }
}

fn read_range(start: &str, end: &str) -> Result<DateRange, JsValue> {
    Ok(DateRange::new(parse_instant(start)?, parse_instant(end)?))
}

fn parse_instant(text: &str) -> Result<DateTime<Utc>, JsValue> {
    parse_timestamp(text).map_err(|err| JsValue::from_str(&err.to_string()))
}

fn serialize<T: Serialize>(value: &T, what: &str) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|err| JsValue::from_str(&format!("Không serialize {what}: {err}")))
}
