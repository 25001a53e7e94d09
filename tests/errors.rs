mod common;

use rusty_pbix::analysis;
use rusty_pbix::analysis::Degradation;
use rusty_pbix::analysis::Granularity;
use rusty_pbix::analysis::RevenuePoint;
use rusty_pbix::loader;
use rusty_pbix::Config;
use rusty_pbix::ErrorKind;
use rusty_pbix::RustyPbixError;

#[test]
fn unsupported_format_is_rejected() {
    let error = loader::load(common::SALES_CSV.as_bytes(), "pdf").unwrap_err();
    assert!(matches!(error, RustyPbixError::UnsupportedFormatError(ref name) if name == "pdf"));
    assert_eq!(error.kind(), ErrorKind::UnsupportedFormat);
}

#[test]
fn malformed_input_is_rejected() {
    for (bytes, format) in [(&b""[..], "csv"), (&b"not json"[..], "json"), (&b"plain text"[..], "xlsx")] {
        let error = rusty_pbix::analyze_bytes(bytes, format, &Config::default()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedInput, "{format}: {error}");
    }
}

#[test]
fn encrypted_workbook_is_malformed() {
    let bytes = common::compound_file(&[("EncryptionInfo", &[0u8; 16][..]), ("EncryptedPackage", &b"ciphertext"[..])]);
    let error = loader::load(&bytes, "xls").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MalformedInput);
    assert!(error.to_string().contains("password protected"), "{error}");
}

#[test]
fn out_of_range_date_serial_is_malformed() {
    let bytes = common::xlsx_1904(&[&["date", "revenue"], &["@1e300", "10"]]);
    let error = loader::load(&bytes, "xlsx").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MalformedInput);
}

#[test]
fn growth_rate_between_two_periods() {
    let csv = common::monthly_csv(&[100.0, 150.0]);
    let result = rusty_pbix::analyze_bytes(csv.as_bytes(), "csv", &Config::default()).unwrap();
    assert_eq!(result.summary.growth_rate, 50.0);
    assert!(!result.summary.degraded);
}

#[test]
fn zero_first_period_degrades_growth() {
    let csv = common::monthly_csv(&[0.0, 100.0]);
    let result = rusty_pbix::analyze_bytes(csv.as_bytes(), "csv", &Config::default()).unwrap();
    assert_eq!(result.summary.growth_rate, 0.0);
    assert!(result.summary.degraded);
    assert!(result.summary.degradations.contains(&Degradation::ZeroBaseGrowth));
}

#[test]
fn linear_forecast_extends_series() {
    let series: Vec<RevenuePoint> = [("2024-01", 100.0), ("2024-02", 110.0), ("2024-03", 120.0)]
        .into_iter()
        .map(|(period, value)| RevenuePoint { period: period.to_owned(), value })
        .collect();
    let forecasts = analysis::forecast(&series, Granularity::Month, 2).unwrap();
    assert_eq!(forecasts.len(), 2);
    assert!((forecasts[0].predicted_value - 130.0).abs() < 1e-9);
    assert!((forecasts[1].predicted_value - 140.0).abs() < 1e-9);
    assert_eq!(forecasts[1].period, "2024-05");
}

#[test]
fn forecast_needs_two_periods() {
    let series = [RevenuePoint { period: "2024-01".to_owned(), value: 100.0 }];
    let error = analysis::forecast(&series, Granularity::Month, 3).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InsufficientData);
    assert!(error.is_recoverable());
}

#[test]
fn single_period_analysis_omits_forecasts() {
    let result = rusty_pbix::analyze_bytes(b"date,revenue\n2024-01-01,10\n2024-01-01,20\n", "csv", &Config::default()).unwrap();
    assert_eq!(result.summary.total_revenue, 30.0);
    assert!(result.forecasts.is_empty());
    assert!(result.summary.degradations.contains(&Degradation::ForecastUnavailable));
}
