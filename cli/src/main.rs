mod source;

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use insight_core::{parse_timestamp, AnalysisRequest, DateRange, InsightConfig};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::source::JsonFileSource;

#[derive(Parser, Debug)]
#[command(
    name = "insight",
    version,
    about = "Trích xuất hồ sơ lâm sàng từ bundle FHIR và phân tích xu hướng sinh trắc."
)]
struct Cli {
    /// File JSON cấu hình (một phần); trường thiếu dùng mặc định.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hồ sơ đầy đủ: bệnh mạn tính, sự kiện, thuốc.
    Profile(BundleArgs),
    /// Chỉ danh sách bệnh mạn tính.
    Conditions(BundleArgs),
    /// Chỉ các sự kiện sức khỏe đáng chú ý, theo thứ tự thời gian.
    Events(BundleArgs),
    /// Phân tích nhịp tim từ file mẫu.
    HeartRate(SampleArgs),
    /// Phân tích đường huyết từ file mẫu.
    Glucose(SampleArgs),
}

#[derive(Args, Debug)]
struct BundleArgs {
    /// Đường dẫn tới file JSON bundle.
    #[arg(short, long)]
    bundle: PathBuf,
    /// Thời điểm trích xuất (RFC 3339); mặc định là hiện tại.
    #[arg(long)]
    as_of: Option<String>,
}

#[derive(Args, Debug)]
struct SampleArgs {
    /// File JSON `{ "heart_rate": ..., "glucose": [...] }`.
    #[arg(short, long)]
    samples: PathBuf,
    /// Định danh người dùng cần phân tích.
    #[arg(short, long, default_value = "default")]
    user: String,
    /// Đầu cửa sổ phân tích (RFC 3339 hoặc YYYY-MM-DD).
    #[arg(long, conflicts_with = "days")]
    start: Option<String>,
    /// Cuối cửa sổ phân tích; mặc định là hiện tại.
    #[arg(long)]
    end: Option<String>,
    /// Số ngày tính lùi từ `--end`.
    #[arg(long)]
    days: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Profile(args) => {
            let (bundle, as_of) = read_bundle(&args)?;
            let profile = insight_fhir::extract_profile(&bundle, &config.clinical, as_of);
            info!(
                patient_id = %profile.patient_id,
                conditions = profile.chronic_conditions.len(),
                events = profile.health_events.len(),
                "profile extracted"
            );
            print_json(&profile)
        }
        Command::Conditions(args) => {
            let (bundle, as_of) = read_bundle(&args)?;
            let records = insight_fhir::extract_records(&bundle);
            let conditions =
                insight_fhir::classify_conditions(&records.conditions, as_of, &config.clinical);
            print_json(&conditions)
        }
        Command::Events(args) => {
            let (bundle, _) = read_bundle(&args)?;
            let records = insight_fhir::extract_records(&bundle);
            let events = insight_fhir::classify_events(
                &records.encounters,
                &records.procedures,
                &config.clinical,
            );
            print_json(&events)
        }
        Command::HeartRate(args) => {
            let (source, request) = open_samples(&args, &config)?;
            let analysis =
                insight_wearables::analyze_heart_rate_for(&source, &request, &config.analysis);
            if analysis.is_none() {
                info!(user = %request.user_id, "no heart-rate data for the window");
            }
            print_json(&analysis)
        }
        Command::Glucose(args) => {
            let (source, request) = open_samples(&args, &config)?;
            let analysis =
                insight_wearables::analyze_glucose_for(&source, &request, &config.analysis);
            if analysis.is_none() {
                info!(user = %request.user_id, "no glucose data for the window");
            }
            print_json(&analysis)
        }
    }
}

/// Log ra stderr để stdout chỉ chứa JSON kết quả.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("insight=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<InsightConfig> {
    let Some(path) = path else {
        return Ok(InsightConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Không đọc được file cấu hình {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Cấu hình {:?} không hợp lệ", path))
}

fn read_bundle(args: &BundleArgs) -> anyhow::Result<(serde_json::Value, DateTime<Utc>)> {
    let data = std::fs::read_to_string(&args.bundle)
        .with_context(|| format!("Không đọc được file {:?}", args.bundle))?;
    let bundle = serde_json::from_str(&data)
        .with_context(|| format!("File {:?} không phải JSON hợp lệ", args.bundle))?;
    let as_of = match args.as_of.as_deref() {
        Some(text) => parse_timestamp(text)?,
        None => Utc::now(),
    };
    Ok((bundle, as_of))
}

fn open_samples(
    args: &SampleArgs,
    config: &InsightConfig,
) -> anyhow::Result<(JsonFileSource, AnalysisRequest)> {
    let source = JsonFileSource::open(&args.samples)?;
    let range = resolve_window(args, config.analysis.window_days, Utc::now())?;
    Ok((source, AnalysisRequest::new(args.user.clone(), range)))
}

fn resolve_window(
    args: &SampleArgs,
    default_days: u32,
    now: DateTime<Utc>,
) -> anyhow::Result<DateRange> {
    let end = match args.end.as_deref() {
        Some(text) => parse_timestamp(text)?,
        None => now,
    };
    let range = match args.start.as_deref() {
        Some(text) => DateRange::new(parse_timestamp(text)?, end),
        None => {
            let days = args.days.unwrap_or(default_days);
            DateRange::new(end - Duration::days(i64::from(days)), end)
        }
    };
    Ok(range)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("Không serialize được kết quả")?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_args(start: Option<&str>, end: Option<&str>, days: Option<u32>) -> SampleArgs {
        SampleArgs {
            samples: PathBuf::from("unused.json"),
            user: "u1".to_string(),
            start: start.map(str::to_string),
            end: end.map(str::to_string),
            days,
        }
    }

    #[test]
    fn window_defaults_to_trailing_config_days() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let range = resolve_window(&sample_args(None, None, None), 7, now).unwrap();
        assert_eq!(range.end, now);
        assert_eq!(range.days(), 7);
    }

    #[test]
    fn explicit_bounds_win() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let range = resolve_window(
            &sample_args(Some("2024-04-01"), Some("2024-04-15T00:00:00Z"), None),
            7,
            now,
        )
        .unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(range.days(), 14);

        let range = resolve_window(&sample_args(None, None, Some(30)), 7, now).unwrap();
        assert_eq!(range.days(), 30);
    }

    #[test]
    fn bad_timestamp_is_reported() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        assert!(resolve_window(&sample_args(None, Some("yesterday"), None), 7, now).is_err());
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "insight",
            "glucose",
            "--samples",
            "cgm.json",
            "--user",
            "patient-9",
            "--days",
            "14",
        ])
        .unwrap();
        match cli.command {
            Command::Glucose(args) => {
                assert_eq!(args.user, "patient-9");
                assert_eq!(args.days, Some(14));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn partial_config_file_loads() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "analysis": {{ "hypo_threshold": 65.0 }} }}"#).unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.analysis.hypo_threshold, 65.0);
        assert_eq!(config.clinical.chronic_onset_days, 180);
    }
}
