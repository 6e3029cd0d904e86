//! Result export in the public result shape.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::results::{AuditResult, BatchManifest, ClaimOutcome, ExportedResult};
use crate::api::session::SessionStatus;
use crate::core::baseline::SnapshotVersion;
use crate::core::errors::{AuditError, Result};

/// Output serialization for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// YAML
    Yaml,
}

impl FromStr for ReportFormat {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(AuditError::validation_field(
                format!("unsupported report format '{other}'"),
                "format",
            )),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        })
    }
}

/// A record rejected during normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRecord {
    /// Position in the batch
    pub position: usize,
    /// Business claim id, when present
    pub claim_id: Option<String>,
    /// Offending field
    pub field: String,
    /// Error message
    pub error: String,
}

/// Report for one batch submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Session identifier
    pub session_id: Uuid,
    /// Final session status
    pub status: SessionStatus,
    /// Baseline version used
    pub baseline_version: SnapshotVersion,
    /// Session-level warnings
    pub warnings: Vec<String>,
    /// Results in submission order
    pub results: Vec<ExportedResult>,
    /// Records rejected during normalization
    pub ingestion_failures: Vec<FailedRecord>,
    /// Claims left unprocessed by an abort
    pub not_processed: Vec<usize>,
}

impl SessionReport {
    /// Build a report from a manifest
    pub fn from_manifest(manifest: &BatchManifest) -> Self {
        let mut ingestion_failures = Vec::new();
        let mut not_processed = Vec::new();
        for outcome in &manifest.outcomes {
            match outcome {
                ClaimOutcome::Audited { .. } => {}
                ClaimOutcome::IngestionFailure {
                    position,
                    claim_id,
                    error,
                } => ingestion_failures.push(FailedRecord {
                    position: *position,
                    claim_id: claim_id.clone(),
                    field: error.field().to_string(),
                    error: error.to_string(),
                }),
                ClaimOutcome::NotProcessed { position, .. } => not_processed.push(*position),
            }
        }

        Self {
            session_id: manifest.session_id,
            status: manifest.status,
            baseline_version: manifest.baseline_version,
            warnings: manifest.warnings.clone(),
            results: manifest.results().map(AuditResult::exported).collect(),
            ingestion_failures,
            not_processed,
        }
    }
}

fn serialize<T: Serialize>(value: &T, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(value).map_err(Into::into),
        ReportFormat::Yaml => serde_yaml::to_string(value).map_err(Into::into),
    }
}

fn write_text(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AuditError::io(
                format!("Failed to create report directory: {}", parent.display()),
                e,
            )
        })?;
    }
    std::fs::write(path, content)
        .map_err(|e| AuditError::io(format!("Failed to write report: {}", path.display()), e))
}

/// Render results in the exported shape
pub fn render_results(results: &[AuditResult], format: ReportFormat) -> Result<String> {
    let exported: Vec<ExportedResult> = results.iter().map(AuditResult::exported).collect();
    serialize(&exported, format)
}

/// Write results in the exported shape
pub fn write_results(
    results: &[AuditResult],
    format: ReportFormat,
    path: impl AsRef<Path>,
) -> Result<()> {
    write_text(&render_results(results, format)?, path.as_ref())
}

/// Render a session report
pub fn render_session(manifest: &BatchManifest, format: ReportFormat) -> Result<String> {
    serialize(&SessionReport::from_manifest(manifest), format)
}

/// Write a session report
pub fn write_session(
    manifest: &BatchManifest,
    format: ReportFormat,
    path: impl AsRef<Path>,
) -> Result<()> {
    write_text(&render_session(manifest, format)?, path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::NormalizationError;
    use crate::core::findings::{Finding, Severity};
    use crate::core::scoring::RecommendedAction;
    use chrono::Utc;

    fn manifest() -> BatchManifest {
        let result = AuditResult {
            claim_id: "C-1".to_string(),
            record_id: Uuid::nil(),
            session_id: Uuid::nil(),
            position: 0,
            findings: vec![Finding::new("upcoding", Severity::Warning, "level 5 billed")],
            suspicion_score: 0.4,
            recommended_action: RecommendedAction::FlagForManualReview,
            anomaly_score: None,
            baseline_version: SnapshotVersion(2),
            model_version: None,
            audit_timestamp: Utc::now(),
        };
        BatchManifest {
            session_id: Uuid::nil(),
            status: SessionStatus::Complete,
            baseline_version: SnapshotVersion(2),
            model_version: None,
            outcomes: vec![
                ClaimOutcome::Audited { result },
                ClaimOutcome::IngestionFailure {
                    position: 1,
                    claim_id: None,
                    error: NormalizationError::missing("claim_id"),
                },
            ],
            warnings: vec!["rule-only".to_string()],
            abort_reason: None,
        }
    }

    #[test]
    fn format_parsing() {
        assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("yml".parse::<ReportFormat>().unwrap(), ReportFormat::Yaml);
        assert!("html".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn session_report_separates_failures() {
        let report = SessionReport::from_manifest(&manifest());
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.ingestion_failures.len(), 1);
        assert_eq!(report.ingestion_failures[0].field, "claim_id");
        assert!(report.not_processed.is_empty());
    }

    #[test]
    fn results_render_as_json_and_yaml() {
        let manifest = manifest();
        let results: Vec<AuditResult> = manifest.results().cloned().collect();

        let json = render_results(&results, ReportFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["recommended_action"], "Flag for manual review");
        assert_eq!(parsed[0]["issues"][0]["rule_id"], "upcoding");

        let yaml = render_results(&results, ReportFormat::Yaml).unwrap();
        assert!(yaml.contains("claim_id: C-1"));
    }

    #[test]
    fn session_report_written_to_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        write_session(&manifest(), ReportFormat::Json, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"ingestion_failures\""));
    }
}
