//! Exact duplicate detection within a lookback window.
//!
//! Claims sharing member, provider, procedure code and date of service are
//! compared by creation order. The earliest-created claim is the original and
//! every later claim inside the window is a duplicate. Batch order and claim id
//! strings never influence which claim is the original.

use chrono::Duration;

use super::context::RuleContext;
use super::AuditRule;
use crate::core::claim::Claim;
use crate::core::findings::{Finding, Severity};

/// Rule identifier
pub const RULE_ID: &str = "duplicate_claim";

/// Flags claims identical to an earlier-created claim
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    lookback: Duration,
}

impl DuplicateDetector {
    /// Detector with a lookback window in days; an unrepresentable window is unbounded
    pub fn new(lookback_days: i64) -> Self {
        Self {
            lookback: Duration::try_days(lookback_days).unwrap_or(Duration::MAX),
        }
    }
}

impl AuditRule for DuplicateDetector {
    fn id(&self) -> &str {
        RULE_ID
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn description(&self) -> &str {
        "Same member, provider, procedure code and date of service billed more than once"
    }

    fn evaluate(&self, claim: &Claim, context: &RuleContext<'_>) -> Vec<Finding> {
        let earlier: Vec<&Claim> = context
            .index
            .created_before(claim)
            .filter(|other| claim.created_at - other.created_at <= self.lookback)
            .collect();

        let Some(original) = earlier.first() else {
            return Vec::new();
        };

        vec![Finding::new(
            RULE_ID,
            self.severity(),
            format!(
                "Claim {} duplicates claim {} (procedure {} on {})",
                claim.claim_id, original.claim_id, claim.procedure_code, claim.date_of_service
            ),
        )
        .with_evidence("original_claim_id", original.claim_id.clone())
        .with_evidence("original_record_id", original.id.to_string())
        .with_evidence("earlier_matches", earlier.len())]
    }
}
