//! Claim normalization: raw records to canonical [`Claim`]s.
//!
//! Normalization is a pure function of the raw record and a
//! [`NormalizationContext`]. Monetary fields are coerced to fixed-point
//! decimals and never pass through floating point.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use uuid::Uuid;

use crate::core::claim::{Claim, RawClaim, DEFAULT_PLACE_OF_SERVICE};
use crate::core::errors::NormalizationError;

type NormResult<T> = std::result::Result<T, NormalizationError>;

/// Namespace for deterministic claim record identifiers
const CLAIM_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6c61_696d_6175_6469_7400_0000_0000_0001);

/// Monetary scale (cents)
const MONEY_SCALE: u32 = 2;

/// Inputs normalization needs besides the record itself
#[derive(Debug, Clone, Copy)]
pub struct NormalizationContext {
    /// Dates of service after this day are rejected
    pub today: NaiveDate,
    /// Creation time used when the record carries none
    pub received_at: DateTime<Utc>,
    /// Position of the record in its batch
    pub sequence: usize,
}

impl NormalizationContext {
    /// Context for a record received at `received_at`
    pub fn new(received_at: DateTime<Utc>, sequence: usize) -> Self {
        Self {
            today: received_at.date_naive(),
            received_at,
            sequence,
        }
    }

    /// Same context for a different batch position
    pub fn at(self, sequence: usize) -> Self {
        Self { sequence, ..self }
    }
}

/// Validate and coerce a raw record into a canonical claim
pub fn normalize(raw: &RawClaim, ctx: &NormalizationContext) -> NormResult<Claim> {
    let claim_id = required_string(raw, &["claim_id"])?;
    let member_id = required_string(raw, &["member_id"])?;
    let provider_id = required_string(raw, &["provider_id"])?;
    let procedure_code = required_string(raw, &["procedure_code", "cpt_code"])?;
    let date_of_service = parse_date_of_service(raw, ctx.today)?;
    let charge_amount = parse_charge_amount(raw)?;
    let units = parse_units(raw)?;
    let place_of_service = optional_string(raw, &["place_of_service"])?
        .unwrap_or_else(|| DEFAULT_PLACE_OF_SERVICE.to_string());
    let self_pay = parse_flag(raw, &["self_pay_flag", "self_pay"])?.unwrap_or(false);
    let explicit_created_at = parse_created_at(raw)?;
    let expected_service_level = parse_service_level(raw)?;

    let id = match optional_string(raw, &["id"])? {
        Some(text) => Uuid::parse_str(&text)
            .map_err(|_| NormalizationError::invalid_type("id", "UUID", text))?,
        None => {
            let fingerprint = format!(
                "{}|{}|{}|{}|{}|{}|{}|{}",
                ctx.sequence,
                claim_id,
                member_id,
                provider_id,
                procedure_code,
                date_of_service,
                charge_amount,
                explicit_created_at
                    .map(|ts| ts.to_rfc3339())
                    .unwrap_or_default()
            );
            Uuid::new_v5(&CLAIM_ID_NAMESPACE, fingerprint.as_bytes())
        }
    };

    Ok(Claim {
        id,
        claim_id,
        member_id,
        provider_id,
        date_of_service,
        procedure_code,
        charge_amount,
        units,
        place_of_service,
        self_pay,
        created_at: explicit_created_at.unwrap_or(ctx.received_at),
        sequence: ctx.sequence,
        expected_service_level,
    })
}

/// Normalize a batch, keeping per-record outcomes independent
pub fn normalize_batch(
    records: &[RawClaim],
    ctx: &NormalizationContext,
) -> Vec<NormResult<Claim>> {
    records
        .iter()
        .enumerate()
        .map(|(sequence, raw)| normalize(raw, &ctx.at(sequence)))
        .collect()
}

/// Best-effort business id of a record, for reporting failed records
pub fn raw_claim_id(raw: &RawClaim) -> Option<String> {
    optional_string(raw, &["claim_id"]).ok().flatten()
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string \"{s}\""),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

fn lookup<'a>(raw: &'a RawClaim, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| raw.get(*name))
        .find(|value| !value.is_null())
}

fn optional_string(raw: &RawClaim, names: &[&str]) -> NormResult<Option<String>> {
    match lookup(raw, names) {
        None => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(NormalizationError::invalid_type(
            names[0],
            "string",
            describe(other),
        )),
    }
}

fn required_string(raw: &RawClaim, names: &[&str]) -> NormResult<String> {
    optional_string(raw, names)?.ok_or_else(|| NormalizationError::missing(names[0]))
}

fn parse_date_of_service(raw: &RawClaim, today: NaiveDate) -> NormResult<NaiveDate> {
    const FIELD: &str = "date_of_service";
    let text = required_string(raw, &[FIELD])?;
    let date = NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(&text).map(|ts| ts.date_naive()))
        .map_err(|_| NormalizationError::invalid_type(FIELD, "YYYY-MM-DD date", text.clone()))?;

    if date > today {
        return Err(NormalizationError::out_of_range(
            FIELD,
            format!("{date} is after {today}"),
        ));
    }
    Ok(date)
}

fn parse_charge_amount(raw: &RawClaim) -> NormResult<Decimal> {
    const FIELD: &str = "charge_amount";
    let value = lookup(raw, &[FIELD]).ok_or_else(|| NormalizationError::missing(FIELD))?;
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s
            .trim()
            .chars()
            .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
            .collect(),
        other => {
            return Err(NormalizationError::invalid_type(
                FIELD,
                "decimal amount",
                describe(other),
            ))
        }
    };
    if text.is_empty() {
        return Err(NormalizationError::missing(FIELD));
    }

    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| NormalizationError::invalid_type(FIELD, "decimal amount", describe(value)))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(NormalizationError::out_of_range(
            FIELD,
            format!("{amount} is negative"),
        ));
    }

    Ok(amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero))
}

fn parse_units(raw: &RawClaim) -> NormResult<u32> {
    const FIELD: &str = "units";
    let units = match lookup(raw, &[FIELD]) {
        None => return Ok(1),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    let raw_value = lookup(raw, &[FIELD]).map(describe).unwrap_or_default();
    let units =
        units.ok_or_else(|| NormalizationError::invalid_type(FIELD, "whole number", raw_value))?;
    if units < 1 {
        return Err(NormalizationError::out_of_range(
            FIELD,
            format!("{units} must be at least 1"),
        ));
    }
    u32::try_from(units)
        .map_err(|_| NormalizationError::out_of_range(FIELD, format!("{units} is too large")))
}

fn parse_flag(raw: &RawClaim, names: &[&str]) -> NormResult<Option<bool>> {
    let Some(value) = lookup(raw, names) else {
        return Ok(None);
    };
    let flag = match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    };
    flag.map(Some)
        .ok_or_else(|| NormalizationError::invalid_type(names[0], "boolean", describe(value)))
}

fn parse_created_at(raw: &RawClaim) -> NormResult<Option<DateTime<Utc>>> {
    const FIELD: &str = "created_at";
    optional_string(raw, &[FIELD])?
        .map(|text| {
            DateTime::parse_from_rfc3339(&text)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|_| NormalizationError::invalid_type(FIELD, "RFC 3339 timestamp", text))
        })
        .transpose()
}

fn parse_service_level(raw: &RawClaim) -> NormResult<Option<u8>> {
    const FIELD: &str = "expected_service_level";
    let Some(value) = lookup(raw, &[FIELD]) else {
        return Ok(None);
    };
    let level = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .ok_or_else(|| NormalizationError::invalid_type(FIELD, "service level", describe(value)))?;

    match u8::try_from(level) {
        Ok(level) if level >= 1 => Ok(Some(level)),
        _ => Err(NormalizationError::out_of_range(
            FIELD,
            format!("{level} is not a valid service level"),
        )),
    }
}

#[cfg(test)]
#[path = "normalizer_tests.rs"]
mod tests;
