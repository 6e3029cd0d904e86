//! Audit results, batch manifests and result-set summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::session::SessionStatus;
use crate::core::baseline::SnapshotVersion;
use crate::core::config::RiskBands;
use crate::core::errors::NormalizationError;
use crate::core::findings::{Finding, Severity};
use crate::core::scoring::RecommendedAction;

/// Complete, explainable audit outcome for one claim in one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    /// Business claim id
    pub claim_id: String,

    /// Canonical claim record id
    pub record_id: Uuid,

    /// Session that produced the result
    pub session_id: Uuid,

    /// Position of the claim in its submitted batch
    pub position: usize,

    /// Findings in rule registration order
    pub findings: Vec<Finding>,

    /// Fused suspicion score in [0, 1]
    pub suspicion_score: f64,

    /// Action selected from the suspicion score
    pub recommended_action: RecommendedAction,

    /// Anomaly score, absent in rule-only mode
    pub anomaly_score: Option<f64>,

    /// Baseline snapshot version the claim was evaluated against
    pub baseline_version: SnapshotVersion,

    /// Anomaly model version, absent in rule-only mode
    pub model_version: Option<String>,

    /// When the result was produced
    pub audit_timestamp: DateTime<Utc>,
}

impl AuditResult {
    /// Result shape handed to reporting collaborators
    pub fn exported(&self) -> ExportedResult {
        ExportedResult {
            claim_id: self.claim_id.clone(),
            issues: self
                .findings
                .iter()
                .map(|finding| ExportedIssue {
                    rule_id: finding.rule_id.clone(),
                    description: finding.description.clone(),
                    severity: finding.severity,
                })
                .collect(),
            suspicion_score: self.suspicion_score,
            recommended_action: self.recommended_action,
            audit_timestamp: self.audit_timestamp,
        }
    }

    /// Scored without the anomaly model
    pub fn is_rule_only(&self) -> bool {
        self.anomaly_score.is_none()
    }

    /// Most severe finding, if any
    pub fn max_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }
}

/// One issue in the exported result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedIssue {
    /// Rule that raised the issue
    pub rule_id: String,
    /// Explanation
    pub description: String,
    /// Severity
    pub severity: Severity,
}

/// `{claim_id, issues, suspicion_score, recommended_action, audit_timestamp}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedResult {
    /// Business claim id
    pub claim_id: String,
    /// Issues found on the claim
    pub issues: Vec<ExportedIssue>,
    /// Fused suspicion score
    pub suspicion_score: f64,
    /// Recommended action label
    pub recommended_action: RecommendedAction,
    /// When the claim was audited
    pub audit_timestamp: DateTime<Utc>,
}

/// Terminal per-claim outcome of a batch submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClaimOutcome {
    /// The claim was audited and its result committed
    Audited {
        /// Committed result
        result: AuditResult,
    },
    /// The raw record could not be normalized
    IngestionFailure {
        /// Position in the batch
        position: usize,
        /// Business claim id, when the record carried one
        claim_id: Option<String>,
        /// What was wrong with the record
        error: NormalizationError,
    },
    /// The session stopped before this claim committed a result
    NotProcessed {
        /// Position in the batch
        position: usize,
        /// Business claim id, when known
        claim_id: Option<String>,
    },
}

impl ClaimOutcome {
    /// Batch position of the claim
    pub fn position(&self) -> usize {
        match self {
            Self::Audited { result } => result.position,
            Self::IngestionFailure { position, .. } | Self::NotProcessed { position, .. } => {
                *position
            }
        }
    }

    /// Business claim id, when known
    pub fn claim_id(&self) -> Option<&str> {
        match self {
            Self::Audited { result } => Some(result.claim_id.as_str()),
            Self::IngestionFailure { claim_id, .. } | Self::NotProcessed { claim_id, .. } => {
                claim_id.as_deref()
            }
        }
    }

    /// Committed result, if the claim was audited
    pub fn result(&self) -> Option<&AuditResult> {
        match self {
            Self::Audited { result } => Some(result),
            _ => None,
        }
    }
}

/// Response to a batch submission
///
/// Per-claim outcomes are kept apart from the overall session status: a batch
/// with ingestion failures still completes, and an aborted session still lists
/// the results it committed before stopping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchManifest {
    /// Session identifier
    pub session_id: Uuid,
    /// Final session status
    pub status: SessionStatus,
    /// Pinned baseline version
    pub baseline_version: SnapshotVersion,
    /// Anomaly model version, absent in rule-only mode
    pub model_version: Option<String>,
    /// One outcome per submitted record, in submission order
    pub outcomes: Vec<ClaimOutcome>,
    /// Session-level warnings
    pub warnings: Vec<String>,
    /// Why the session aborted, if it did
    pub abort_reason: Option<String>,
}

impl BatchManifest {
    /// Committed results in submission order
    pub fn results(&self) -> impl Iterator<Item = &AuditResult> {
        self.outcomes.iter().filter_map(ClaimOutcome::result)
    }

    /// Number of audited claims
    pub fn audited_count(&self) -> usize {
        self.results().count()
    }

    /// Number of records rejected by normalization
    pub fn ingestion_failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ClaimOutcome::IngestionFailure { .. }))
            .count()
    }

    /// Number of claims left unprocessed by an abort
    pub fn not_processed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ClaimOutcome::NotProcessed { .. }))
            .count()
    }

    /// True when the session aborted; committed results remain valid
    pub fn is_incomplete(&self) -> bool {
        self.status == SessionStatus::Aborted
    }
}

/// Offset/limit pagination request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Items to skip
    pub offset: usize,
    /// Maximum items to return
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 100,
        }
    }
}

impl Page {
    /// Page starting at `offset`
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

/// One page of items plus the total count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Items across all pages
    pub total: usize,
    /// Offset used
    pub offset: usize,
    /// Limit used
    pub limit: usize,
}

impl<T> Paged<T> {
    /// Slice a full, already ordered item list
    pub fn from_items(items: Vec<T>, page: Page) -> Self {
        let total = items.len();
        let items = items
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();
        Self {
            items,
            total,
            offset: page.offset,
            limit: page.limit,
        }
    }

    /// More items exist after this page
    pub fn has_more(&self) -> bool {
        self.offset + self.items.len() < self.total
    }
}

/// Summary of the latest result per claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AuditStatistics {
    /// Claims with at least one committed result
    pub total_audited: usize,
    /// Ingestion failures across all sessions
    pub ingestion_failures: usize,
    /// Latest results at or above the high risk band
    pub high_risk: usize,
    /// Latest results in the medium risk band
    pub medium_risk: usize,
    /// Latest results in the low risk band
    pub low_risk: usize,
    /// Latest results per recommended action label
    pub action_counts: BTreeMap<String, usize>,
    /// Findings per rule id across latest results
    pub rule_counts: BTreeMap<String, usize>,
    /// Mean suspicion score across latest results
    pub average_suspicion_score: f64,
}

impl AuditStatistics {
    /// Summarise the latest results
    pub fn from_results<'a, I>(results: I, ingestion_failures: usize, bands: &RiskBands) -> Self
    where
        I: IntoIterator<Item = &'a AuditResult>,
    {
        let mut stats = Self {
            ingestion_failures,
            ..Self::default()
        };
        let mut score_sum = 0.0;

        for result in results {
            stats.total_audited += 1;
            score_sum += result.suspicion_score;

            let score = result.suspicion_score;
            if score >= bands.high {
                stats.high_risk += 1;
            } else if score >= bands.medium {
                stats.medium_risk += 1;
            } else if score >= bands.low {
                stats.low_risk += 1;
            }

            *stats
                .action_counts
                .entry(result.recommended_action.label().to_string())
                .or_default() += 1;
            for finding in &result.findings {
                *stats.rule_counts.entry(finding.rule_id.clone()).or_default() += 1;
            }
        }

        if stats.total_audited > 0 {
            stats.average_suspicion_score = score_sum / stats.total_audited as f64;
        }
        stats
    }
}
