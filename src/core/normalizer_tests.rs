use super::*;
use chrono::TimeZone;
use serde_json::json;

fn ctx() -> NormalizationContext {
    NormalizationContext::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(), 0)
}

fn record(value: serde_json::Value) -> RawClaim {
    value.as_object().cloned().expect("object literal")
}

fn valid() -> serde_json::Value {
    json!({
        "claim_id": "CLM-001",
        "member_id": "M-1",
        "provider_id": "P-1",
        "date_of_service": "2024-05-20",
        "procedure_code": "99213",
        "charge_amount": "125.50",
    })
}

#[test]
fn normalizes_minimal_record_with_defaults() {
    let claim = normalize(&record(valid()), &ctx()).expect("valid claim");
    assert_eq!(claim.claim_id, "CLM-001");
    assert_eq!(claim.procedure_code, "99213");
    assert_eq!(claim.charge_amount, Decimal::new(12550, 2));
    assert_eq!(claim.units, 1);
    assert_eq!(claim.place_of_service, DEFAULT_PLACE_OF_SERVICE);
    assert!(!claim.self_pay);
    assert_eq!(claim.created_at, ctx().received_at);
    assert_eq!(claim.sequence, 0);
}

#[test]
fn accepts_cpt_code_alias_and_numeric_fields() {
    let mut raw = valid();
    raw.as_object_mut().unwrap().remove("procedure_code");
    raw["cpt_code"] = json!(99214);
    raw["charge_amount"] = json!(150);
    raw["units"] = json!("2");
    let claim = normalize(&record(raw), &ctx()).unwrap();
    assert_eq!(claim.procedure_code, "99214");
    assert_eq!(claim.charge_amount, Decimal::new(150, 0));
    assert_eq!(claim.units, 2);
}

#[test]
fn coerces_currency_strings_to_cents() {
    let mut raw = valid();
    raw["charge_amount"] = json!("$1,234.565");
    let claim = normalize(&record(raw), &ctx()).unwrap();
    assert_eq!(claim.charge_amount, Decimal::new(123457, 2));
}

#[test]
fn missing_procedure_code_names_the_field() {
    let mut raw = valid();
    raw.as_object_mut().unwrap().remove("procedure_code");
    let err = normalize(&record(raw), &ctx()).unwrap_err();
    assert_eq!(err, NormalizationError::missing("procedure_code"));
}

#[test]
fn blank_strings_count_as_missing() {
    let mut raw = valid();
    raw["member_id"] = json!("   ");
    let err = normalize(&record(raw), &ctx()).unwrap_err();
    assert!(matches!(err, NormalizationError::MissingField { ref field } if field == "member_id"));
}

#[test]
fn negative_charge_is_out_of_range() {
    let mut raw = valid();
    raw["charge_amount"] = json!(-5);
    let err = normalize(&record(raw), &ctx()).unwrap_err();
    assert!(matches!(err, NormalizationError::OutOfRange { .. }));
    assert_eq!(err.field(), "charge_amount");
}

#[test]
fn zero_charge_is_allowed() {
    let mut raw = valid();
    raw["charge_amount"] = json!("0.00");
    let claim = normalize(&record(raw), &ctx()).unwrap();
    assert!(claim.charge_amount.is_zero());
}

#[test]
fn unparsable_charge_is_invalid_type() {
    let mut raw = valid();
    raw["charge_amount"] = json!("twelve");
    let err = normalize(&record(raw), &ctx()).unwrap_err();
    assert!(matches!(err, NormalizationError::InvalidType { .. }));

    let mut raw = valid();
    raw["charge_amount"] = json!([1, 2]);
    let err = normalize(&record(raw), &ctx()).unwrap_err();
    assert!(matches!(err, NormalizationError::InvalidType { .. }));
}

#[test]
fn future_date_of_service_is_rejected() {
    let mut raw = valid();
    raw["date_of_service"] = json!("2024-06-02");
    let err = normalize(&record(raw), &ctx()).unwrap_err();
    assert!(matches!(err, NormalizationError::OutOfRange { ref field, .. } if field == "date_of_service"));
}

#[test]
fn malformed_date_is_invalid_type() {
    let mut raw = valid();
    raw["date_of_service"] = json!("05/20/2024");
    let err = normalize(&record(raw), &ctx()).unwrap_err();
    assert!(matches!(err, NormalizationError::InvalidType { .. }));
}

#[test]
fn zero_units_are_rejected() {
    let mut raw = valid();
    raw["units"] = json!(0);
    let err = normalize(&record(raw), &ctx()).unwrap_err();
    assert!(matches!(err, NormalizationError::OutOfRange { ref field, .. } if field == "units"));
}

#[test]
fn parses_self_pay_flag_variants() {
    for (value, expected) in [
        (json!(true), true),
        (json!("Y"), true),
        (json!("no"), false),
        (json!(1), true),
    ] {
        let mut raw = valid();
        raw["self_pay_flag"] = value;
        let claim = normalize(&record(raw), &ctx()).unwrap();
        assert_eq!(claim.self_pay, expected);
    }

    let mut raw = valid();
    raw["self_pay"] = json!("maybe");
    assert!(normalize(&record(raw), &ctx()).is_err());
}

#[test]
fn explicit_created_at_and_id_are_honoured() {
    let mut raw = valid();
    raw["created_at"] = json!("2024-05-21T08:30:00Z");
    raw["id"] = json!("7f8c1b2a-4a4b-4a8e-9b2b-0e0f1a2b3c4d");
    let claim = normalize(&record(raw), &ctx()).unwrap();
    assert_eq!(
        claim.created_at,
        Utc.with_ymd_and_hms(2024, 5, 21, 8, 30, 0).unwrap()
    );
    assert_eq!(
        claim.id.to_string(),
        "7f8c1b2a-4a4b-4a8e-9b2b-0e0f1a2b3c4d"
    );
}

#[test]
fn derived_ids_are_deterministic() {
    let first = normalize(&record(valid()), &ctx()).unwrap();
    let later = NormalizationContext::new(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(), 0);
    let second = normalize(&record(valid()), &later).unwrap();
    assert_eq!(first.id, second.id);

    let mut other = valid();
    other["claim_id"] = json!("CLM-002");
    let third = normalize(&record(other), &ctx()).unwrap();
    assert_ne!(first.id, third.id);
}

#[test]
fn batch_normalization_isolates_failures() {
    let mut broken = valid();
    broken.as_object_mut().unwrap().remove("provider_id");
    let records = vec![record(valid()), record(broken), record(valid())];
    let outcomes = normalize_batch(&records, &ctx());
    assert!(outcomes[0].is_ok());
    assert!(outcomes[1].is_err());
    assert_eq!(outcomes[2].as_ref().unwrap().sequence, 2);
    assert_eq!(raw_claim_id(&records[1]).as_deref(), Some("CLM-001"));
}

#[test]
fn identical_records_at_different_positions_get_distinct_ids() {
    let records = vec![record(valid()), record(valid())];
    let outcomes = normalize_batch(&records, &ctx());
    let first = outcomes[0].as_ref().unwrap();
    let second = outcomes[1].as_ref().unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(first.duplicate_key(), second.duplicate_key());
}
