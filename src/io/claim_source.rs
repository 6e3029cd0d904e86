//! Raw claim record sources.
//!
//! Records are read as loosely structured JSON objects. Shape checks beyond
//! "each record is an object" belong to the normalizer, except for CSV uploads,
//! whose header row must name every required column.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core::claim::{Claim, RawClaim};
use crate::core::errors::{AuditError, Result};
use crate::core::normalizer::{normalize_batch, NormalizationContext};

/// On-disk record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// A JSON array, or an object with a `claims` array
    Json,
    /// One JSON object per line
    JsonLines,
    /// A YAML list, or a mapping with a `claims` list
    Yaml,
    /// Comma-separated values with a header row
    Csv,
}

/// Header groups a CSV claim file must contain; any name in a group satisfies it
const REQUIRED_CSV_COLUMNS: &[&[&str]] = &[
    &["claim_id"],
    &["member_id"],
    &["provider_id"],
    &["date_of_service"],
    &["cpt_code", "procedure_code"],
    &["charge_amount"],
];

impl SourceFormat {
    /// Guess the format from a file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("jsonl" | "ndjson") => Self::JsonLines,
            Some("yaml" | "yml") => Self::Yaml,
            Some("csv") => Self::Csv,
            _ => Self::Json,
        }
    }
}

/// Load raw records from a file, choosing the format by extension
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<RawClaim>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        AuditError::io(format!("Failed to read claims file: {}", path.display()), e)
    })?;
    let records = parse_records(&content, SourceFormat::from_path(path))?;
    debug!(path = %path.display(), records = records.len(), "Loaded claim records");
    Ok(records)
}

/// Parse raw records from text
pub fn parse_records(content: &str, format: SourceFormat) -> Result<Vec<RawClaim>> {
    let values: Vec<Value> = match format {
        SourceFormat::Csv => return parse_csv(content),
        SourceFormat::Json => unwrap_container(serde_json::from_str(content)?)?,
        SourceFormat::Yaml => unwrap_container(serde_yaml::from_str(content)?)?,
        SourceFormat::JsonLines => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(number, line)| {
                serde_json::from_str(line).map_err(|e| {
                    AuditError::from(e).with_context(format!("line {}", number + 1))
                })
            })
            .collect::<Result<_>>()?,
    };

    values
        .into_iter()
        .enumerate()
        .map(|(position, value)| match value {
            Value::Object(map) => Ok(map),
            other => Err(AuditError::validation_field(
                format!("record {position} is not an object: {other}"),
                "claims",
            )),
        })
        .collect()
}

/// One record per row keyed by header; empty cells are left out so the
/// normalizer reports them as missing
fn parse_csv(content: &str) -> Result<Vec<RawClaim>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let missing: Vec<&str> = REQUIRED_CSV_COLUMNS
        .iter()
        .filter(|names| !names.iter().any(|name| headers.iter().any(|h| h == name)))
        .map(|names| names[0])
        .collect();
    if !missing.is_empty() {
        return Err(AuditError::validation_field(
            format!("Missing required columns: {}", missing.join(", ")),
            "columns",
        ));
    }

    reader
        .records()
        .enumerate()
        .map(|(row, record)| {
            let record = record
                .map_err(|e| AuditError::from(e).with_context(format!("row {}", row + 1)))?;
            let mut map = Map::new();
            for (header, cell) in headers.iter().zip(record.iter()) {
                if !cell.is_empty() {
                    map.insert(header.clone(), Value::String(cell.to_string()));
                }
            }
            Ok(map)
        })
        .collect()
}

fn unwrap_container(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("claims") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(AuditError::validation_field(
                "expected a list of claims or an object with a 'claims' list",
                "claims",
            )),
        },
        Value::Null => Ok(Vec::new()),
        _ => Err(AuditError::validation_field(
            "expected a list of claims",
            "claims",
        )),
    }
}

/// Normalize historical records, skipping the ones that fail
pub fn normalize_history(records: &[RawClaim], ctx: &NormalizationContext) -> Vec<Claim> {
    normalize_batch(records, ctx)
        .into_iter()
        .enumerate()
        .filter_map(|(position, outcome)| match outcome {
            Ok(claim) => Some(claim),
            Err(err) => {
                warn!(position, "Skipping historical record: {}", err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn json_array_and_wrapped_object() {
        let plain = parse_records(r#"[{"claim_id": "A"}, {"claim_id": "B"}]"#, SourceFormat::Json)
            .unwrap();
        assert_eq!(plain.len(), 2);

        let wrapped =
            parse_records(r#"{"claims": [{"claim_id": "A"}]}"#, SourceFormat::Json).unwrap();
        assert_eq!(wrapped[0]["claim_id"], "A");
    }

    #[test]
    fn json_lines_skip_blank_lines() {
        let content = "{\"claim_id\": \"A\"}\n\n{\"claim_id\": \"B\"}\n";
        let records = parse_records(content, SourceFormat::JsonLines).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn yaml_list() {
        let content = "- claim_id: A\n  charge_amount: 12.5\n- claim_id: B\n";
        let records = parse_records(content, SourceFormat::Yaml).unwrap();
        assert_eq!(records[1]["claim_id"], "B");
    }

    #[test]
    fn csv_rows_become_records_keyed_by_header() {
        let content = "claim_id,member_id,provider_id,date_of_service,cpt_code,charge_amount,self_pay\n\
                       CLM-1,M-1,P-1,2024-01-02,99213,\"1,250.00\",\n\
                       CLM-2,M-2,P-1,2024-01-03,93000,80, yes\n";
        let records = parse_records(content, SourceFormat::Csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["cpt_code"], "99213");
        assert_eq!(records[0]["charge_amount"], "1,250.00");
        assert!(!records[0].contains_key("self_pay"));
        assert_eq!(records[1]["self_pay"], "yes");

        let ctx = NormalizationContext::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(), 0);
        let claims = normalize_history(&records, &ctx);
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].procedure_code, "99213");
        assert!(claims[1].self_pay);
    }

    #[test]
    fn csv_without_required_columns_is_rejected_up_front() {
        let content = "claim_id,member_id,date_of_service,charge_amount\nCLM-1,M-1,2024-01-02,10\n";
        let err = parse_records(content, SourceFormat::Csv).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("provider_id"), "{message}");
        assert!(message.contains("cpt_code"), "{message}");
        assert!(!message.contains("member_id"), "{message}");
    }

    #[test]
    fn procedure_code_header_satisfies_the_code_column() {
        let content = "claim_id,member_id,provider_id,date_of_service,procedure_code,charge_amount\n\
                       CLM-1,M-1,P-1,2024-01-02,99213,10\n";
        let records = parse_records(content, SourceFormat::Csv).unwrap();
        assert_eq!(records[0]["procedure_code"], "99213");
    }

    #[test]
    fn non_object_records_are_rejected() {
        assert!(parse_records("[1, 2]", SourceFormat::Json).is_err());
        assert!(parse_records("\"claims\"", SourceFormat::Json).is_err());
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            SourceFormat::from_path(Path::new("claims.JSONL")),
            SourceFormat::JsonLines
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("claims.yml")),
            SourceFormat::Yaml
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("upload.csv")),
            SourceFormat::Csv
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("claims")),
            SourceFormat::Json
        );
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claims.jsonl");
        std::fs::write(&path, "{\"claim_id\": \"A\"}\n").unwrap();
        assert_eq!(load_records(&path).unwrap().len(), 1);
        assert!(load_records(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn history_normalization_drops_bad_records() {
        let records = parse_records(
            r#"[
                {"claim_id": "A", "member_id": "M", "provider_id": "P",
                 "date_of_service": "2024-01-02", "procedure_code": "99213", "charge_amount": 100},
                {"claim_id": "B"}
            ]"#,
            SourceFormat::Json,
        )
        .unwrap();
        let ctx = NormalizationContext::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(), 0);
        let claims = normalize_history(&records, &ctx);
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].claim_id, "A");
    }
}
