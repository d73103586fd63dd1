//! Biometric trend, episode and anomaly analysis for wearable and CGM data.

mod aggregate;
mod anomaly;
mod episodes;
mod risk;
mod stats;
mod trend;

pub use aggregate::{
    analyze_glucose, analyze_glucose_for, analyze_heart_rate, analyze_heart_rate_for,
    AVERAGE_GLUCOSE, GLUCOSE_VARIABILITY, HEART_RATE_VARIABILITY, MAX_HEART_RATE,
    RESTING_HEART_RATE, TIME_IN_RANGE,
};
pub use anomaly::{count_anomalies, detect_anomalies, Anomaly};
pub use episodes::{
    count_hyper_episodes, count_hypo_episodes, dawn_phenomenon_severity, find_episodes, Episode,
    Excursion,
};
pub use risk::{evaluate, RiskRule, RuleContext, GLUCOSE_RULES, HEART_RATE_RULES};
pub use trend::{analyze_trend, confidence};
