use super::*;
use tempfile::tempdir;

fn expect_config_error<T: std::fmt::Debug>(result: Result<T>) -> AuditError {
    result.expect_err("expected configuration failure")
}

#[test]
fn default_configs_validate_successfully() {
    AuditConfig::default().validate().expect("audit default");
    FusionConfig::default().validate().expect("fusion default");
    CodeTables::default().validate().expect("tables default");
}

#[test]
fn non_positive_threshold_is_a_configuration_error() {
    let mut config = AuditConfig::default();
    config.outlier_zscore_threshold = 0.0;
    let err = expect_config_error(config.validate());
    assert!(matches!(err, AuditError::Config { .. }));
    assert!(
        format!("{err}").contains("outlier_zscore_threshold"),
        "unexpected error message: {err}"
    );
}

#[test]
fn lookback_must_be_positive() {
    let mut config = AuditConfig::default();
    config.duplicate_lookback_days = -1;
    let err = expect_config_error(config.validate());
    assert!(format!("{err}").contains("duplicate_lookback_days"));
}

#[test]
fn lookback_beyond_time_span_range_is_rejected() {
    let mut config = AuditConfig::default();
    config.duplicate_lookback_days = 200_000_000_000_000;
    let err = expect_config_error(config.validate());
    match err {
        AuditError::Config { field, .. } => {
            assert_eq!(field.as_deref(), Some("duplicate_lookback_days"))
        }
        other => panic!("unexpected error {other:?}"),
    }

    config.duplicate_lookback_days = 3_650;
    config.validate().expect("ten years is a valid lookback");
}

#[test]
fn critical_deviation_cannot_undercut_threshold() {
    let mut config = AuditConfig::default();
    config.outlier_zscore_threshold = 5.0;
    config.price_outlier.critical_deviation = 4.0;
    let err = expect_config_error(config.validate());
    assert!(format!("{err}").contains("critical_deviation"));
}

#[test]
fn anomaly_weight_outside_unit_range_is_rejected() {
    let mut config = AuditConfig::default();
    config.anomaly_weight = 1.5;
    assert!(config.validate().is_err());
}

#[test]
fn partial_yaml_fills_defaults() {
    let yaml = r#"
outlier_zscore_threshold: 2.5
severity_weights:
  critical: 0.8
action_thresholds:
  refer_for_provider_dispute: 0.9
"#;
    let config: AuditConfig = serde_yaml::from_str(yaml).expect("parse partial config");
    assert_eq!(config.outlier_zscore_threshold, 2.5);
    assert_eq!(config.severity_weights.critical, 0.8);
    assert_eq!(config.severity_weights.warning, 0.40);
    assert_eq!(config.action_thresholds.refer_for_provider_dispute, 0.9);
    assert_eq!(config.action_thresholds.request_medical_records, 0.60);
    assert_eq!(config.duplicate_lookback_days, 30);
    assert!(config.validate().is_ok());
}

#[test]
fn yaml_round_trip_through_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("claimaudit.yml");

    let mut config = AuditConfig::default();
    config.min_baseline_sample_count = 12;
    config.to_yaml_file(&path).expect("write config");

    let loaded = AuditConfig::from_yaml_file(&path).expect("read config");
    assert_eq!(loaded, config);
}

#[test]
fn missing_config_file_is_io_error() {
    let err = AuditConfig::from_yaml_file("/nonexistent/claimaudit.yml").unwrap_err();
    assert!(matches!(err, AuditError::Io { .. }));
}

#[test]
fn fusion_view_mirrors_top_level_fields() {
    let mut config = AuditConfig::default();
    config.anomaly_weight = 0.25;
    let fusion = config.fusion();
    assert_eq!(fusion.anomaly_weight, 0.25);
    assert_eq!(fusion.severity_weights, config.severity_weights);
}
